//! Core domain models and types for cott
//!
//! This crate contains the measurement vocabulary shared by every other
//! cott crate: typed metric keys, the accumulators that collect repeated
//! samples, the immutable results they finalize into, and the declared
//! test cases that drive a run. It performs no I/O.

pub mod accumulator;
pub mod error;
pub mod metric;
pub mod report;
pub mod test_case;

// Re-export commonly used types at the crate root
pub use accumulator::{CaseAccumulator, StepAccumulator};
pub use error::{ParseError, Result};
pub use metric::{Metric, MetricKey, UnitOfMeasure, UnitPrefix};
pub use report::{CaseResults, Report, StepResults, TestCaseSummary};
pub use test_case::{
    ComponentType, ResourceKind, StepDefinition, TableKind, TestCase, DEFAULT_REPETITIONS,
};
