//! Bounded exponential backoff for store calls.
//!
//! Only [`StoreError::is_retryable`] failures are retried. Everything else
//! is returned on the first attempt.

use std::thread;
use std::time::Duration;

use crate::store::{Result, StoreError};

/// Retry configuration.
///
/// Defaults: 3 attempts, 100ms initial delay doubling up to 2s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. At least 1.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// A policy that retries without sleeping.
    #[cfg(test)]
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1,
        }
    }

    /// Delay before retry number `retry` (0-based), capped at `max_delay`.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(retry);
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }

    /// Run `op`, retrying retryable failures until attempts run out.
    pub fn run<T>(&self, what: &str, mut op: impl FnMut() -> Result<T>) -> Result<T> {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(what, attempt, "store call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if err.is_retryable() && attempt < attempts => {
                    let delay = self.delay_for_retry(attempt - 1);
                    tracing::warn!(
                        what,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "store call failed, retrying"
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(err) => return Err(exhausted(what, attempt, err)),
            }
        }
    }
}

fn exhausted(what: &str, attempt: u32, err: StoreError) -> StoreError {
    if err.is_retryable() {
        tracing::error!(what, attempt, error = %err, "store call failed, giving up");
    }
    err
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::Cell;

    #[test]
    fn delay_grows_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
            multiplier: 2,
        };
        assert_eq!(policy.delay_for_retry(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_retry(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_retry(2), Duration::from_millis(350));
        assert_eq!(policy.delay_for_retry(40), Duration::from_millis(350));
    }

    #[test]
    fn retries_unavailable_until_success() {
        let calls = Cell::new(0);
        let result = RetryPolicy::immediate(3).run("find", || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(StoreError::Unavailable("timeout".into()))
            } else {
                Ok(7)
            }
        });
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let calls = Cell::new(0);
        let result: Result<()> = RetryPolicy::immediate(3).run("find", || {
            calls.set(calls.get() + 1);
            Err(StoreError::Unavailable("503".into()))
        });
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn never_retries_non_retryable() {
        let calls = Cell::new(0);
        let result: Result<()> = RetryPolicy::immediate(3).run("update", || {
            calls.set(calls.get() + 1);
            Err(StoreError::Rejected("constraint".into()))
        });
        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }
}
