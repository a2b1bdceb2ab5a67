//! Resilience patterns for cott
//!
//! Bounded, fixed-budget retries used to wait for a freshly launched
//! instance to accept connections.

pub mod retry;

pub use retry::{RetryError, RetryExecutor, RetryPolicy, Retryable};
