//! Bounded retry with exponential backoff

use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Backoff schedule for retrying store contention
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound on any single delay
    pub max_delay: Duration,
    /// Consecutive retryable failures required before a fallback may run
    pub fallback_after: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            fallback_after: 2,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry `retry` (1-based): `min(base * 2^(retry-1), max)`
    pub fn delay_before_retry(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1_u32 << exponent)
            .min(self.max_delay)
    }
}

/// Why a retried operation gave up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError<E> {
    /// A non-retryable error; no further attempts were made
    Fatal { attempts: u32, error: E },
    /// Every attempt failed with a retryable error
    Exhausted {
        attempts: u32,
        consecutive_retryable: u32,
        last: E,
    },
}

impl<E> RetryError<E> {
    /// The error that ended the loop
    pub fn into_inner(self) -> E {
        match self {
            Self::Fatal { error, .. } => error,
            Self::Exhausted { last, .. } => last,
        }
    }
}

/// Run `operation` until it succeeds, fails fatally, or runs out of attempts.
///
/// `operation` receives the 1-based attempt number. Only errors for which
/// `is_retryable` returns true are retried, after the policy's delay.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    is_retryable: impl Fn(&E) -> bool,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    E: fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut consecutive_retryable = 0;
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) if !is_retryable(&error) => {
                return Err(RetryError::Fatal {
                    attempts: attempt,
                    error,
                });
            }
            Err(error) => {
                consecutive_retryable += 1;
                if attempt >= max_attempts {
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        consecutive_retryable,
                        last: error,
                    });
                }

                let delay = policy.delay_before_retry(attempt);
                tracing::warn!(
                    "Attempt {attempt}/{max_attempts} failed: {error}; retrying in {}ms",
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
