//! Logging setup for cott
//!
//! Library crates only emit `tracing` events. The binary calls
//! [`init_logging`] once with the configured [`LoggingConfig`](cott_config::LoggingConfig)
//! and keeps the returned guard alive until the report has been written.

pub mod init;

pub use init::{build_filter, init_logging, init_simple_tracing, LoggingGuard};
