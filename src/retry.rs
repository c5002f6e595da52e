//! Bounded retry with a pluggable backoff policy
//!
//! The loop is explicit: it counts attempts, asks the error whether it is worth
//! retrying, and sleeps according to a [`BackoffPolicy`] between attempts. The
//! attempt count is always reported back, whether the operation finally
//! succeeded or not.
//!
//! # Example
//!
//! ```no_run
//! use sprite_harvest::retry::{BackoffPolicy, IsRetryable, retry_with_backoff};
//! use std::time::Duration;
//!
//! #[derive(Debug)]
//! struct Flaky;
//!
//! impl std::fmt::Display for Flaky {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "flaky")
//!     }
//! }
//!
//! impl IsRetryable for Flaky {
//!     fn is_retryable(&self) -> bool {
//!         true
//!     }
//! }
//!
//! # async fn example() {
//! let policy = BackoffPolicy::Fixed(Duration::from_millis(500));
//! let outcome = retry_with_backoff(&policy, 3, || async { Ok::<_, Flaky>(()) }).await;
//! assert_eq!(outcome.attempts, 1);
//! # }
//! ```

use crate::error::DownloadFailure;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for DownloadFailure {
    fn is_retryable(&self) -> bool {
        match self {
            DownloadFailure::Network(_)
            | DownloadFailure::Timeout
            | DownloadFailure::HttpStatus(_)
            | DownloadFailure::Body(_) => true,
            // CDN error pages come and go; a non-image response is worth another try
            DownloadFailure::NonImage { .. } => true,
            // Local disk problems will not fix themselves between attempts
            DownloadFailure::Write { .. } => false,
        }
    }
}

/// How long to wait before each retry
#[derive(Clone, Debug, PartialEq)]
pub enum BackoffPolicy {
    /// Same delay before every retry
    Fixed(Duration),
    /// Delay grows by `multiplier` after each retry, capped at `max`
    Exponential {
        /// Delay before the first retry
        initial: Duration,
        /// Growth factor per retry
        multiplier: f64,
        /// Upper bound on any single delay
        max: Duration,
        /// Add up to 100% random jitter on top of the computed delay
        jitter: bool,
    },
}

impl BackoffPolicy {
    /// Delay before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        match self {
            BackoffPolicy::Fixed(delay) => *delay,
            BackoffPolicy::Exponential {
                initial,
                multiplier,
                max,
                jitter,
            } => {
                let exponent = retry.saturating_sub(1) as i32;
                let secs = initial.as_secs_f64() * multiplier.powi(exponent);
                let delay = Duration::from_secs_f64(secs.min(max.as_secs_f64()));
                if *jitter { add_jitter(delay) } else { delay }
            }
        }
    }
}

/// Result of a retried operation together with the number of attempts made
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    /// Final result: the first success, or the last error
    pub result: Result<T, E>,
    /// Attempts made, always at least 1
    pub attempts: u32,
}

/// Run `operation` until it succeeds, fails permanently, or `max_retries`
/// retries have been spent. At most `max_retries + 1` attempts are made.
pub async fn retry_with_backoff<F, Fut, T, E>(
    policy: &BackoffPolicy,
    max_retries: u32,
    mut operation: F,
) -> RetryOutcome<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut attempts = 0;

    loop {
        attempts += 1;
        match operation().await {
            Ok(value) => {
                if attempts > 1 {
                    tracing::info!(attempts, "Operation succeeded after retry");
                }
                return RetryOutcome {
                    result: Ok(value),
                    attempts,
                };
            }
            Err(e) if e.is_retryable() && attempts <= max_retries => {
                let delay = policy.delay_for(attempts);
                tracing::warn!(
                    error = %e,
                    attempt = attempts,
                    max_retries,
                    delay_ms = delay.as_millis(),
                    "Operation failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::warn!(
                        error = %e,
                        attempts,
                        "Operation failed after all retry attempts exhausted"
                    );
                } else {
                    tracing::warn!(error = %e, "Operation failed with non-retryable error");
                }
                return RetryOutcome {
                    result: Err(e),
                    attempts,
                };
            }
        }
    }
}

/// Jitter is uniform between 0% and 100% of the delay
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}
