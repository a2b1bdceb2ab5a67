//! Configuration error types

use thiserror::Error;

/// Configuration result type
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Anything that stops a configuration from being loaded
///
/// All of these are fatal to a run: they are reported before any instance
/// is launched.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// A cross-domain rule failed, e.g. no test cases declared
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// A `COTT_*` override could not be parsed
    #[error("Invalid environment override: {0}")]
    EnvError(String),

    /// A single domain failed its own validation
    #[error("Invalid {domain} configuration: {message}")]
    DomainError { domain: String, message: String },
}
