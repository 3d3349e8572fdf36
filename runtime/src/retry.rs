//! Caller-side retry for retryable engine errors.
//!
//! The engine never retries on its own: a [`LotteryError::Conflict`] means
//! another writer got there first, and whether to try again from a fresh read
//! is the caller's decision. This module is that decision made reusable.
//! Only errors with [`LotteryError::is_retryable`] are retried.
//!
//! # Example
//!
//! ```rust,no_run
//! use lottery_runtime::retry::{RetryPolicy, retry_retryable};
//! use lottery_runtime::LotteryService;
//! use lottery_core::EventId;
//!
//! # async fn example(service: LotteryService, event_id: EventId) -> Result<(), lottery_core::LotteryError> {
//! let drawn = retry_retryable(RetryPolicy::default(), || service.run_draw(event_id, 5)).await?;
//! println!("{} invited", drawn.actual_count);
//! # Ok(())
//! # }
//! ```

use lottery_core::LotteryError;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Retry policy with exponential backoff.
///
/// # Default Values
///
/// - `max_retries`: 3
/// - `initial_delay`: 20ms
/// - `max_delay`: 1 second
/// - `multiplier`: 2.0
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt
    pub max_retries: usize,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Cap on the delay between retries
    pub max_delay: Duration,
    /// Backoff multiplier
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(20),
            max_delay: Duration::from_secs(1),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Set the number of retries
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the first delay
    #[must_use]
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Delay before retry number `attempt` (0-based), capped at `max_delay`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::cast_sign_loss)]
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return self.initial_delay.min(self.max_delay);
        }
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let delay_ms = self.initial_delay.as_millis() as f64 * self.multiplier.powi(exponent);
        if !delay_ms.is_finite() || delay_ms >= self.max_delay.as_millis() as f64 {
            return self.max_delay;
        }
        Duration::from_millis(delay_ms as u64)
    }
}

/// Run `operation`, retrying while it fails with a retryable error.
///
/// Non-retryable errors, including zero-effect ones like
/// [`LotteryError::EmptyWaitlist`], are returned at once.
///
/// # Errors
///
/// The first non-retryable error, or the last retryable one once
/// `policy.max_retries` is exhausted.
pub async fn retry_retryable<F, Fut, T>(policy: RetryPolicy, mut operation: F) -> Result<T, LotteryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LotteryError>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!(attempt, "Operation succeeded after retry");
                }
                return Ok(value);
            },
            Err(error) if !error.is_retryable() => return Err(error),
            Err(error) => {
                if attempt >= policy.max_retries {
                    tracing::warn!(attempt, %error, "Giving up after max retries");
                    return Err(error);
                }
                let delay = policy.delay_for_attempt(attempt);
                tracing::debug!(attempt, delay_ms = delay.as_millis(), %error, "Retrying");
                sleep(delay).await;
                attempt += 1;
            },
        }
    }
}
