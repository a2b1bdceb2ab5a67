//! Error types for report delivery

use thiserror::Error;

/// Report delivery errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OutputError {
    #[error("Failed to serialize report as {format}: {error}")]
    Serialization { format: String, error: String },

    #[error("Filesystem error during {operation} on '{path}': {error}")]
    Filesystem {
        path: String,
        operation: String,
        error: String,
    },
}

/// Result type for report delivery
pub type OutputResult<T> = Result<T, OutputError>;
