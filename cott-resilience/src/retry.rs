//! Retry policy and executor

use log::{debug, info, trace, warn};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::sleep;

/// Fixed-interval polling with a hard attempt budget
///
/// The total wait is bounded by `interval * (max_attempts - 1)`; there is no
/// other timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included
    pub max_attempts: u32,

    /// Delay slept after every failed attempt
    pub interval: Duration,
}

impl RetryPolicy {
    pub fn fixed(interval: Duration, max_attempts: u32) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }
}

/// Trait for errors that can be retried
pub trait Retryable {
    /// Whether this error is retryable
    fn is_retryable(&self) -> bool;
}

/// Retry executor
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute an operation that needs exclusive access to `target`
    ///
    /// Each attempt reborrows `target`, so the operation can be an async
    /// method taking `&mut self`.
    pub async fn execute_on<S, F, T, E>(&self, target: &mut S, mut f: F) -> Result<T, RetryError<E>>
    where
        S: ?Sized,
        F: for<'a> FnMut(&'a mut S) -> Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>,
        E: Retryable + std::fmt::Display,
    {
        let mut attempt = 1;

        loop {
            trace!("Executing attempt {} of {}", attempt, self.max_attempts());

            match f(&mut *target).await {
                Ok(result) => {
                    if attempt > 1 {
                        info!("Operation succeeded after {} attempts", attempt);
                    }
                    return Ok(result);
                }
                Err(error) => {
                    let delay = self.next_delay(attempt, error)?;
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    fn max_attempts(&self) -> u32 {
        self.policy.max_attempts.max(1)
    }

    /// Delay before the next attempt, or the error to give up with
    fn next_delay<E>(&self, attempt: u32, error: E) -> Result<Duration, RetryError<E>>
    where
        E: Retryable + std::fmt::Display,
    {
        if !error.is_retryable() {
            warn!("Operation failed with non-retryable error: {}", error);
            return Err(RetryError::NonRetryableError(error));
        }

        if attempt >= self.max_attempts() {
            warn!("Operation failed after {} attempts: {}", attempt, error);
            return Err(RetryError::MaxAttemptsExceeded {
                attempts: attempt,
                last_error: error,
            });
        }

        debug!(
            "Attempt {} failed: {}. Retrying in {:?}",
            attempt, error, self.policy.interval
        );
        Ok(self.policy.interval)
    }
}

/// Retry error types
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    #[error("Maximum retry attempts ({attempts}) exceeded. Last error: {last_error}")]
    MaxAttemptsExceeded { attempts: u32, last_error: E },

    #[error("Non-retryable error: {0}")]
    NonRetryableError(E),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct TestError {
        retryable: bool,
        message: String,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.message)
        }
    }

    impl Retryable for TestError {
        fn is_retryable(&self) -> bool {
            self.retryable
        }
    }

    /// Fails with `error` until `failures_left` runs out
    struct Endpoint {
        failures_left: u32,
        calls: u32,
        error: TestError,
    }

    impl Endpoint {
        fn refusing(failures: u32) -> Self {
            Self {
                failures_left: failures,
                calls: 0,
                error: TestError {
                    retryable: true,
                    message: "connection refused".to_string(),
                },
            }
        }

        fn ping(&mut self) -> Pin<Box<dyn Future<Output = Result<u32, TestError>> + Send + '_>> {
            Box::pin(async move {
                self.calls += 1;
                if self.failures_left > 0 {
                    self.failures_left -= 1;
                    Err(self.error.clone())
                } else {
                    Ok(self.calls)
                }
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_on_reborrows_target() {
        let executor = RetryExecutor::new(RetryPolicy::fixed(Duration::from_millis(100), 10));
        let mut endpoint = Endpoint::refusing(4);

        let started = tokio::time::Instant::now();
        let result = executor.execute_on(&mut endpoint, |e| e.ping()).await;

        assert_eq!(result.unwrap(), 5);
        assert_eq!(endpoint.calls, 5);
        assert_eq!(started.elapsed(), Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_readiness_budget_is_exhausted() {
        let executor = RetryExecutor::new(RetryPolicy::fixed(Duration::from_millis(100), 300));
        let mut endpoint = Endpoint::refusing(u32::MAX);

        let started = tokio::time::Instant::now();
        let result = executor.execute_on(&mut endpoint, |e| e.ping()).await;

        match result {
            Err(RetryError::MaxAttemptsExceeded {
                attempts,
                last_error,
            }) => {
                assert_eq!(attempts, 300);
                assert_eq!(last_error.message, "connection refused");
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(endpoint.calls, 300);
        assert_eq!(started.elapsed(), Duration::from_millis(100 * 299));
    }

    #[tokio::test]
    async fn test_non_retryable_error_stops_immediately() {
        let executor = RetryExecutor::new(RetryPolicy::fixed(Duration::from_secs(1), 5));
        let mut endpoint = Endpoint::refusing(1);
        endpoint.error = TestError {
            retryable: false,
            message: "bad credentials".to_string(),
        };

        let result = executor.execute_on(&mut endpoint, |e| e.ping()).await;

        assert!(matches!(result, Err(RetryError::NonRetryableError(_))));
        assert_eq!(endpoint.calls, 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_tries_once() {
        let executor = RetryExecutor::new(RetryPolicy::fixed(Duration::from_secs(1), 0));
        let mut endpoint = Endpoint::refusing(1);

        let result = executor.execute_on(&mut endpoint, |e| e.ping()).await;

        assert!(matches!(
            result,
            Err(RetryError::MaxAttemptsExceeded { attempts: 1, .. })
        ));
    }
}
