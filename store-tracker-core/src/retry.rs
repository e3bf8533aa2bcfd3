//! Retry with exponential backoff for remote calls.
//!
//! The remote client performs exactly one physical request per call. This
//! module composes retry around individual call sites: transient failures are
//! retried after `base_delay * 2^attempt`, anything else propagates at once.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use store_tracker_remote::RemoteError;

use crate::error::CoreError;

/// Default number of attempts, including the first one.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
/// Default delay before the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(300);

/// Errors that know whether retrying may help.
pub trait TransientError {
    fn is_transient(&self) -> bool;

    /// Server-suggested minimum wait, if any.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl TransientError for RemoteError {
    fn is_transient(&self) -> bool {
        RemoteError::is_transient(self)
    }

    fn retry_after(&self) -> Option<Duration> {
        RemoteError::retry_after(self).map(Duration::from_secs)
    }
}

impl TransientError for CoreError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Remote(e) => e.is_transient(),
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Remote(e) => TransientError::retry_after(e),
            _ => None,
        }
    }
}

/// Bounded retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Values below 1 behave as 1.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each subsequent retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
        }
    }

    /// Backoff after the failed attempt with zero-based index `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

/// Runs `operation` until it succeeds, fails fatally, or attempts run out.
///
/// Each failed attempt is logged with its 1-based index. The error from the
/// last attempt is returned unchanged.
pub async fn with_retry<T, E, F, Fut>(policy: &RetryPolicy, label: &str, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: TransientError + Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    log::info!("[retry] {label} succeeded on attempt {}", attempt + 1);
                }
                return Ok(value);
            }
            Err(err) => {
                if !err.is_transient() {
                    log::warn!("[retry] {label} attempt {} failed (fatal): {err}", attempt + 1);
                    return Err(err);
                }
                if attempt + 1 >= max_attempts {
                    log::warn!(
                        "[retry] {label} attempt {}/{max_attempts} failed, giving up: {err}",
                        attempt + 1
                    );
                    return Err(err);
                }

                let backoff = policy.delay_for(attempt);
                let delay = err.retry_after().map_or(backoff, |hint| backoff.max(hint));
                log::warn!(
                    "[retry] {label} attempt {}/{max_attempts} failed: {err}; retrying in {}ms",
                    attempt + 1,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
