//! Driver error types

use cott_resilience::Retryable;
use thiserror::Error;

/// Errors raised by component drivers
///
/// Messages are kept as strings so the error can be cloned across retries
/// and recorded verbatim in the report.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DriverError {
    #[error("connection was not established")]
    ConnectionNotEstablished,

    #[error("connection attempt timed out after {0:?}")]
    ConnectTimeout(std::time::Duration),

    #[error("no required env var key '{0}'")]
    MissingEnvVar(String),

    #[error("invalid identifier '{0}'")]
    InvalidIdentifier(String),

    #[error("{0}")]
    Database(String),
}

impl From<sqlx::Error> for DriverError {
    fn from(error: sqlx::Error) -> Self {
        DriverError::Database(error.to_string())
    }
}

impl Retryable for DriverError {
    fn is_retryable(&self) -> bool {
        match self {
            DriverError::ConnectionNotEstablished
            | DriverError::ConnectTimeout(_)
            | DriverError::Database(_) => true,
            DriverError::MissingEnvVar(_) | DriverError::InvalidIdentifier(_) => false,
        }
    }
}

/// Result type for driver operations
pub type DriverResult<T> = Result<T, DriverError>;

/// Reject anything but plain SQL identifiers
///
/// Names are spliced into DDL, which cannot take bind parameters.
pub fn check_identifier(name: &str) -> DriverResult<&str> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(name)
    } else {
        Err(DriverError::InvalidIdentifier(name.to_string()))
    }
}
