//! Domain-specific configuration modules

pub mod execution;
pub mod logging;
pub mod report;
pub mod runtime;
pub mod utils;

use crate::error::{ConfigError, ConfigResult};
use crate::validation::Validatable;
use cott_core::TestCase;
use serde::{Deserialize, Serialize};

/// Main cott configuration combining all domains
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CottConfig {
    pub logging: logging::LoggingConfig,

    pub report: report::ReportConfig,

    pub runtime: runtime::RuntimeConfig,

    pub execution: execution::ExecutionConfig,

    /// Declared cases, run in this order.
    ///
    /// Individual cases are not validated here: a case that cannot be
    /// constructed becomes an error entry in the report instead of failing
    /// the whole run.
    pub test_cases: Vec<TestCase>,
}

impl CottConfig {
    /// Validate all domain configurations
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.logging.validate()?;
        self.report.validate()?;
        self.runtime.validate()?;
        self.execution.validate()?;

        if self.test_cases.is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one test case must be declared".to_string(),
            ));
        }

        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let config = CottConfig {
            test_cases: vec![TestCase::new("postgres", "postgres:16", 5432)
                .with_env_var("POSTGRES_USER", "cott")
                .with_env_var("POSTGRES_PASSWORD", "cott")
                .with_repetitions(3)],
            ..CottConfig::default()
        };
        serde_yaml::to_string(&config)
            .unwrap_or_else(|_| "# Failed to generate sample config".to_string())
    }
}
