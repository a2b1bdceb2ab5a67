//! Core error types for cott

use thiserror::Error;

/// Result type alias for core parsing operations
pub type Result<T> = std::result::Result<T, ParseError>;

/// Errors raised while interpreting declared values
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown component for testing: '{0}'")]
    UnknownComponentType(String),

    #[error("invalid unit of measure: {0}")]
    InvalidUnit(String),

    #[error("invalid unit prefix: {0}")]
    InvalidUnitPrefix(String),
}
