//! Exponential backoff for retryable responses
//!
//! The policy is pure: callers pass in the attempt number and the time spent
//! so far, so backoff decisions can be tested without sleeping.

use std::time::Duration;

use rand::Rng;

use crate::utils::constants::{
    DEFAULT_MAX_RETRIES, DEFAULT_RETRY_BASE_DELAY_MS, DEFAULT_RETRY_MAX_DELAY_MS,
    DEFAULT_RETRY_MAX_ELAPSED_SECS,
};

/// Factor applied to the delay after every attempt
const BACKOFF_MULTIPLIER: f64 = 2.0;

/// Upper bound of the random jitter added to each delay
const MAX_JITTER: Duration = Duration::from_millis(250);

/// Retry envelope for one URL
///
/// ```text
/// delay(n) = min(base_delay * 2^(n-1), max_delay) + jitter
/// ```
///
/// A retry is scheduled only while `attempt < max_attempts` and the total
/// elapsed time, including the upcoming delay, stays within `max_elapsed`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    max_elapsed: Duration,
    jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(DEFAULT_RETRY_BASE_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_RETRY_MAX_DELAY_MS),
            max_elapsed: Duration::from_secs(DEFAULT_RETRY_MAX_ELAPSED_SECS),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// `max_attempts` counts the initial request and is clamped to at least 1
    #[must_use]
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        max_delay: Duration,
        max_elapsed: Duration,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
            max_elapsed,
            jitter: true,
        }
    }

    /// A policy that never retries
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Disable random jitter (deterministic delays, used by tests)
    #[must_use]
    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether a response status should be retried at all
    #[must_use]
    pub fn is_retryable(&self, status: u16) -> bool {
        super::FetchError::is_retryable_status(status)
    }

    /// Delay before the next attempt, `None` when the budget is spent
    ///
    /// `attempt` is the 1-indexed attempt that just failed.
    #[must_use]
    pub fn next_delay(&self, attempt: u32, elapsed: Duration) -> Option<Duration> {
        if attempt >= self.max_attempts {
            log::debug!("Retry budget exhausted after {attempt} attempts");
            return None;
        }

        let delay = self.backoff(attempt);
        if elapsed + delay > self.max_elapsed {
            log::debug!(
                "Retry would exceed elapsed budget ({:?} + {:?} > {:?})",
                elapsed,
                delay,
                self.max_elapsed
            );
            return None;
        }

        Some(delay)
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31) as i32;
        let delay_ms = self.base_delay.as_millis() as f64 * BACKOFF_MULTIPLIER.powi(exponent);
        let capped_ms = delay_ms.min(self.max_delay.as_millis() as f64);

        let jitter = if self.jitter {
            Duration::from_millis(rand::rng().random_range(0..=MAX_JITTER.as_millis() as u64))
        } else {
            Duration::ZERO
        };

        Duration::from_millis(capped_ms as u64) + jitter
    }
}
