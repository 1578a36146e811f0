//! Retry policy with exponential backoff
//!
//! One policy object is applied at every network boundary and at the sink.
//! A transient failure is retried up to `max_retries` times, sleeping
//! `base_delay * 2^n` before retry `n`; permanent failures return immediately.

use crate::config::ScraperConfig;
use crate::FetchError;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// An error the retry policy knows how to classify and wrap
pub trait Retryable: Display + Sized {
    fn is_transient(&self) -> bool;

    /// Wraps the last failure once retries run out
    fn exhausted(self, operation: &str, attempts: u32) -> Self;
}

impl Retryable for FetchError {
    fn is_transient(&self) -> bool {
        FetchError::is_transient(self)
    }

    fn exhausted(self, operation: &str, attempts: u32) -> Self {
        FetchError::Exhausted {
            operation: operation.to_string(),
            attempts,
            last: Box::new(self),
        }
    }
}

/// Retries transient failures with doubling backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    pub fn from_config(config: &ScraperConfig) -> Self {
        Self::new(
            config.max_retries,
            Duration::from_millis(config.retry_base_delay_ms),
        )
    }

    /// Total attempts including the first
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Backoff before retry number `retry` (0-based)
    pub fn backoff(&self, retry: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(retry.min(16)))
    }

    /// Runs `op` until it succeeds, fails permanently, or retries run out
    ///
    /// Exhausting retries on a transient failure yields the error's
    /// exhausted form (e.g. `FetchError::Exhausted`) carrying the last error.
    pub async fn run<T, E, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, E>
    where
        E: Retryable,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut retry = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) if retry >= self.max_retries => {
                    tracing::warn!(operation, attempts = retry + 1, error = %e, "Retries exhausted");
                    return Err(e.exhausted(operation, retry + 1));
                }
                Err(e) => {
                    let backoff = self.backoff(retry);
                    tracing::warn!(
                        operation,
                        attempt = retry + 1,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    retry += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2))
    }
}
