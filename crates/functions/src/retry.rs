//! Composable retry with exponential backoff.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

/// Errors that can report whether retrying could ever help.
pub trait Retryable {
    /// Permanent failures propagate immediately: given the same input the
    /// outcome cannot change (bad configuration, auth, forbidden,
    /// not-found).
    fn is_permanent(&self) -> bool;
}

/// Retry policy shared across invocations.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Always at least 1.
    pub max_attempts: u32,
    /// Delay before attempt 2; doubles for each attempt after that.
    pub base_delay: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Backoff delay after the failed attempt numbered `attempt` (1-based):
    /// `base_delay * 2^(attempt-1)`.
    #[must_use]
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Run `operation` until it succeeds, fails permanently, or exhausts
/// `policy.max_attempts`. The final error is propagated unchanged.
///
/// This wraps any no-argument async operation; it is not tied to a
/// particular endpoint or transport.
pub async fn retry_with_backoff<T, E, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    E: Retryable + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 1u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_permanent() => return Err(error),
            Err(error) if attempt >= policy.max_attempts => return Err(error),
            Err(error) => {
                let delay = policy.backoff_after(attempt);
                warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Attempt failed, backing off"
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
