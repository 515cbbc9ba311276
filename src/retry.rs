//! Retry with exponential backoff
//!
//! A small bounded-retry executor for the fetch paths: run an async
//! operation up to `max_attempts` times, sleeping `base_delay * 2^(n-1)`
//! after the n-th failure. There is no jitter and no cap on the delay; the
//! last error is returned unchanged so callers can still branch on its
//! classification.

use std::future::Future;
use std::time::Duration;

/// Default number of attempts (initial call included).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default base delay between attempts.
pub const DEFAULT_BASE_DELAY_MS: u64 = 1000;

/// Retry configuration.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Delay after the first failure; doubles after each subsequent one.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with custom settings.
    pub fn new(max_attempts: u32, base_delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::from_millis(base_delay_ms),
        }
    }

    /// Delay slept after the given 1-based attempt fails.
    ///
    /// Attempt 1 -> base, attempt 2 -> 2x base, attempt 3 -> 4x base, ...
    pub fn delay_after_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }

    /// Runs `operation` until it succeeds or `max_attempts` is exhausted.
    ///
    /// Every error is retried; the error from the final attempt is returned
    /// as-is.
    pub async fn run<T, E, F, Fut>(&self, mut operation: F) -> Result<T, E>
    where
        E: std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!("attempt {} succeeded", attempt);
                    }
                    return Ok(value);
                }
                Err(e) if attempt < self.max_attempts => {
                    let delay = self.delay_after_attempt(attempt);
                    tracing::debug!(
                        "attempt {} of {} failed ({}), retrying in {:?}",
                        attempt,
                        self.max_attempts,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::debug!("attempt {} of {} failed ({}), giving up", attempt, self.max_attempts, e);
                    return Err(e);
                }
            }
        }
    }
}
