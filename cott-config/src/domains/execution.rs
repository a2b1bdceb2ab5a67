//! Case execution configuration

use crate::error::ConfigResult;
use crate::validation::{validate_identifier, validate_positive, validate_required_string, Validatable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings shared by every case's repetition loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Database created and dropped around every repetition
    pub resource_name: String,

    /// Host the launched instance is reachable on
    pub host: String,

    /// Pause between readiness probes
    #[serde(
        with = "crate::domains::utils::serde_duration_millis",
        rename = "readiness_interval_ms"
    )]
    pub readiness_interval: Duration,

    /// Readiness probes before a repetition gives up
    pub readiness_max_attempts: u32,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            resource_name: "cott".to_string(),
            host: "localhost".to_string(),
            readiness_interval: Duration::from_millis(100),
            readiness_max_attempts: 300,
        }
    }
}

impl ExecutionConfig {
    /// Upper bound on the readiness wait
    pub fn readiness_budget(&self) -> Duration {
        self.readiness_interval
            .saturating_mul(self.readiness_max_attempts)
    }
}

impl Validatable for ExecutionConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_identifier(&self.resource_name, "resource_name", self.domain_name())?;
        validate_required_string(&self.host, "host", self.domain_name())?;
        validate_positive(
            self.readiness_interval.as_millis(),
            "readiness_interval_ms",
            self.domain_name(),
        )?;
        validate_positive(
            self.readiness_max_attempts,
            "readiness_max_attempts",
            self.domain_name(),
        )?;
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "execution"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_config_defaults() {
        let config = ExecutionConfig::default();
        assert_eq!(config.resource_name, "cott");
        assert_eq!(config.readiness_budget(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_execution_config_validation() {
        let mut config = ExecutionConfig::default();
        config.readiness_max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = ExecutionConfig::default();
        config.resource_name = "drop table".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_readiness_interval_in_millis() {
        let config: ExecutionConfig =
            serde_yaml::from_str("readiness_interval_ms: 250\nreadiness_max_attempts: 4").unwrap();
        assert_eq!(config.readiness_interval, Duration::from_millis(250));
        assert_eq!(config.readiness_budget(), Duration::from_secs(1));
    }
}
