//! Point-in-time resource counters

use serde::{Deserialize, Serialize};

/// Resource counters of one instance at one moment
///
/// CPU time and the I/O figures are cumulative since the instance started,
/// memory is the current usage. A field the runtime cannot provide is `None`
/// and produces no sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub cpu_time_nanos: Option<u64>,
    pub memory_bytes: Option<u64>,
    pub block_read_bytes: Option<u64>,
    pub block_write_bytes: Option<u64>,
    pub net_rx_bytes: Option<u64>,
    pub net_tx_bytes: Option<u64>,
}

impl ResourceSnapshot {
    /// True when no field is populated
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Parse a human readable size as printed by `docker stats`
///
/// Accepts decimal (`kB`, `MB`) and binary (`KiB`, `MiB`) suffixes.
pub fn parse_human_size(text: &str) -> Option<u64> {
    let text = text.trim();
    let split = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(text.len());
    let (number, unit) = text.split_at(split);
    let number: f64 = number.parse().ok()?;

    let factor: f64 = match unit.trim() {
        "" | "B" => 1.0,
        "kB" | "KB" => 1e3,
        "MB" => 1e6,
        "GB" => 1e9,
        "TB" => 1e12,
        "KiB" => 1024.0,
        "MiB" => 1024.0 * 1024.0,
        "GiB" => 1024.0 * 1024.0 * 1024.0,
        "TiB" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        _ => return None,
    };

    Some((number * factor).round() as u64)
}

/// Parse a `used / total` or `in / out` pair
pub fn parse_size_pair(text: &str) -> Option<(u64, u64)> {
    let (left, right) = text.split_once('/')?;
    Some((parse_human_size(left)?, parse_human_size(right)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_human_size() {
        assert_eq!(parse_human_size("0B"), Some(0));
        assert_eq!(parse_human_size("648B"), Some(648));
        assert_eq!(parse_human_size("12kB"), Some(12_000));
        assert_eq!(parse_human_size("1.5MiB"), Some(1_572_864));
        assert_eq!(parse_human_size(" 7.6GiB "), Some(8_160_437_862));
        assert_eq!(parse_human_size("3.2MB"), Some(3_200_000));
        assert_eq!(parse_human_size("--"), None);
        assert_eq!(parse_human_size("12parsecs"), None);
    }

    #[test]
    fn test_parse_size_pair() {
        assert_eq!(parse_size_pair("12kB / 0B"), Some((12_000, 0)));
        assert_eq!(parse_size_pair("1KiB / 2KiB"), Some((1024, 2048)));
        assert_eq!(parse_size_pair("12kB"), None);
    }

    #[test]
    fn test_empty_snapshot() {
        assert!(ResourceSnapshot::default().is_empty());
        let snapshot = ResourceSnapshot {
            memory_bytes: Some(1),
            ..Default::default()
        };
        assert!(!snapshot.is_empty());
    }
}
