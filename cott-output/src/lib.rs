//! Report delivery for cott
//!
//! Serializes a finished [`Report`](cott_core::Report) in the configured
//! format and writes it to the configured file.

pub mod error;
pub mod writer;

pub use error::{OutputError, OutputResult};
pub use writer::{ReportWriter, WriteSummary};
