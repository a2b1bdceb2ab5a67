//! Step execution and metrics accumulation engine for cott
//!
//! The engine runs every declared test case against a freshly launched
//! instance, brackets each step with duration and resource sampling,
//! repeats the whole step sequence to average out noise and assembles the
//! finalized results into a [`Report`](cott_core::Report).

pub mod builder;
pub mod error;
pub mod factory;
pub mod orchestrator;
pub mod runner;
pub mod steps;

// Re-export main types
pub use builder::ReportBuilder;
pub use error::{EngineError, EngineResult};
pub use factory::{DefaultDriverFactory, DriverFactory};
pub use orchestrator::{CaseOrchestrator, RepetitionPlan};
pub use runner::{ResourceSampler, StepRunner};
pub use steps::Step;
