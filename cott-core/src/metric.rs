//! Metric keys and finalized metric values
//!
//! A [`MetricKey`] is the `(name, unit, prefix)` triple identifying one
//! measurable quantity. Identity covers all three fields, so a duration in
//! microseconds and a duration in milliseconds never share a bucket.

use crate::error::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unit of measure of a metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitOfMeasure {
    Byte,
    Second,
    Piece,
}

impl UnitOfMeasure {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitOfMeasure::Byte => "byte",
            UnitOfMeasure::Second => "second",
            UnitOfMeasure::Piece => "piece",
        }
    }
}

impl fmt::Display for UnitOfMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for UnitOfMeasure {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "byte" => Ok(UnitOfMeasure::Byte),
            "second" => Ok(UnitOfMeasure::Second),
            "piece" => Ok(UnitOfMeasure::Piece),
            _ => Err(ParseError::InvalidUnit(s.to_string())),
        }
    }
}

/// Decimal prefix applied to a unit of measure
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitPrefix {
    Nano,
    Micro,
    Milli,
    None,
    Kilo,
    Mega,
    Giga,
    Tera,
    Peta,
}

impl UnitPrefix {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitPrefix::Nano => "nano",
            UnitPrefix::Micro => "micro",
            UnitPrefix::Milli => "milli",
            UnitPrefix::None => "none",
            UnitPrefix::Kilo => "kilo",
            UnitPrefix::Mega => "mega",
            UnitPrefix::Giga => "giga",
            UnitPrefix::Tera => "tera",
            UnitPrefix::Peta => "peta",
        }
    }

    /// Multiplier converting a prefixed value into the base unit
    pub fn factor(&self) -> f64 {
        match self {
            UnitPrefix::Nano => 1e-9,
            UnitPrefix::Micro => 1e-6,
            UnitPrefix::Milli => 1e-3,
            UnitPrefix::None => 1.0,
            UnitPrefix::Kilo => 1e3,
            UnitPrefix::Mega => 1e6,
            UnitPrefix::Giga => 1e9,
            UnitPrefix::Tera => 1e12,
            UnitPrefix::Peta => 1e15,
        }
    }
}

impl fmt::Display for UnitPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for UnitPrefix {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nano" => Ok(UnitPrefix::Nano),
            "micro" => Ok(UnitPrefix::Micro),
            "milli" => Ok(UnitPrefix::Milli),
            "none" | "" => Ok(UnitPrefix::None),
            "kilo" => Ok(UnitPrefix::Kilo),
            "mega" => Ok(UnitPrefix::Mega),
            "giga" => Ok(UnitPrefix::Giga),
            "tera" => Ok(UnitPrefix::Tera),
            "peta" => Ok(UnitPrefix::Peta),
            _ => Err(ParseError::InvalidUnitPrefix(s.to_string())),
        }
    }
}

/// Typed identity of a measurable quantity
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MetricKey {
    pub name: String,
    #[serde(rename = "uom")]
    pub unit: UnitOfMeasure,
    #[serde(rename = "uom-prefix")]
    pub prefix: UnitPrefix,
}

impl MetricKey {
    pub fn new(name: impl Into<String>, unit: UnitOfMeasure, prefix: UnitPrefix) -> Self {
        Self {
            name: name.into(),
            unit,
            prefix,
        }
    }

    /// Wall-clock duration of one step invocation
    pub fn duration() -> Self {
        Self::new("duration", UnitOfMeasure::Second, UnitPrefix::Micro)
    }

    /// CPU time consumed by the instance while the step ran
    pub fn cpu_time() -> Self {
        Self::new("cpuTime", UnitOfMeasure::Second, UnitPrefix::Nano)
    }

    /// Absolute memory usage of the instance after the step
    pub fn memory_usage() -> Self {
        Self::new("memoryUsage", UnitOfMeasure::Byte, UnitPrefix::None)
    }

    /// Memory usage change across the step
    pub fn memory_usage_diff() -> Self {
        Self::new("memoryUsageDiff", UnitOfMeasure::Byte, UnitPrefix::None)
    }

    pub fn block_read() -> Self {
        Self::new("blockRead", UnitOfMeasure::Byte, UnitPrefix::None)
    }

    pub fn block_write() -> Self {
        Self::new("blockWrite", UnitOfMeasure::Byte, UnitPrefix::None)
    }

    pub fn net_rx() -> Self {
        Self::new("netRx", UnitOfMeasure::Byte, UnitPrefix::None)
    }

    pub fn net_tx() -> Self {
        Self::new("netTx", UnitOfMeasure::Byte, UnitPrefix::None)
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}{}]", self.name, self.prefix, self.unit)
    }
}

/// A metric reduced to its representative value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    #[serde(flatten)]
    pub key: MetricKey,
    /// Arithmetic mean of every sample recorded under `key`
    pub value: f64,
    /// Number of samples the mean was computed over
    pub samples: usize,
}

impl Metric {
    /// Reduce a non-empty sample list to its arithmetic mean.
    ///
    /// Returns `None` for an empty list: a key with no samples has no
    /// representative value.
    pub fn from_samples(key: MetricKey, samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let sum: f64 = samples.iter().sum();
        Some(Self {
            key,
            value: sum / samples.len() as f64,
            samples: samples.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_key_identity_covers_prefix() {
        let micro = MetricKey::new("duration", UnitOfMeasure::Second, UnitPrefix::Micro);
        let milli = MetricKey::new("duration", UnitOfMeasure::Second, UnitPrefix::Milli);
        assert_ne!(micro, milli);
        assert_eq!(micro, MetricKey::duration());
    }

    #[test]
    fn test_unit_prefix_from_str() {
        assert_eq!(UnitPrefix::from_str("micro").unwrap(), UnitPrefix::Micro);
        assert_eq!(UnitPrefix::from_str("MILLI").unwrap(), UnitPrefix::Milli);
        assert_eq!(UnitPrefix::from_str("").unwrap(), UnitPrefix::None);
        assert!(UnitPrefix::from_str("centi").is_err());
    }

    #[test]
    fn test_unit_of_measure_from_str() {
        assert_eq!(UnitOfMeasure::from_str("byte").unwrap(), UnitOfMeasure::Byte);
        assert!(UnitOfMeasure::from_str("meter").is_err());
    }

    #[test]
    fn test_metric_from_samples_mean() {
        let metric = Metric::from_samples(MetricKey::duration(), &[10.0, 20.0, 30.0]).unwrap();
        assert_eq!(metric.value, 20.0);
        assert_eq!(metric.samples, 3);
    }

    #[test]
    fn test_metric_from_empty_samples() {
        assert!(Metric::from_samples(MetricKey::duration(), &[]).is_none());
    }

    #[test]
    fn test_metric_serialization_shape() {
        let metric = Metric::from_samples(MetricKey::memory_usage(), &[4.0]).unwrap();
        let json = serde_json::to_value(&metric).unwrap();
        assert_eq!(json["name"], "memoryUsage");
        assert_eq!(json["uom"], "byte");
        assert_eq!(json["uom-prefix"], "none");
        assert_eq!(json["value"], 4.0);
        assert_eq!(json["samples"], 1);
    }
}
