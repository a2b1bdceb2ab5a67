//! Runtime error types

use thiserror::Error;

/// Errors raised while driving a container runtime
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Failed to run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Docker API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    #[error("Unexpected runtime output: {0}")]
    UnexpectedOutput(String),
}

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;
