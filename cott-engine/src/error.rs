//! Error types for step and case execution

use cott_core::ParseError;
use cott_drivers::DriverError;
use thiserror::Error;

/// Engine errors
///
/// Every variant but `NoTestCases` is recorded inside the report rather
/// than returned from a run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The case cannot be constructed; fatal to that case only
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The readiness probe never succeeded within its budget
    #[error("connectivity error: {0}")]
    Connectivity(String),

    /// The wrapped step call failed; the message is kept verbatim
    #[error("{0}")]
    Operation(String),

    /// The runtime could not report resource usage
    #[error("resource snapshot error: {0}")]
    ResourceSnapshot(String),

    #[error("no test cases to run")]
    NoTestCases,
}

impl From<DriverError> for EngineError {
    fn from(err: DriverError) -> Self {
        Self::Operation(err.to_string())
    }
}

impl From<ParseError> for EngineError {
    fn from(err: ParseError) -> Self {
        Self::Configuration(err.to_string())
    }
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
