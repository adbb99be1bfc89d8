//! Bounded re-attempts with a fixed delay

use crate::config::RetryConfig;
use crate::extract::ExtractError;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Re-attempt policy for the page-load step of a detail page
///
/// Only transient failures are retried; anything else is returned at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Runs `operation` until it succeeds, fails permanently, or runs out of attempts
    ///
    /// # Arguments
    ///
    /// * `what` - Description used in log messages
    /// * `cancel` - Aborts the delay between attempts
    /// * `operation` - Produces a fresh attempt each time it is called
    pub async fn run<T, F, Fut>(
        &self,
        what: &str,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> Result<T, ExtractError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ExtractError>>,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!("{} succeeded on attempt {}", what, attempt);
                    }
                    return Ok(value);
                }
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    tracing::warn!(
                        "Attempt {}/{} failed for {}: {}. Retrying in {:?}",
                        attempt,
                        self.max_attempts,
                        what,
                        e,
                        self.delay
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(ExtractError::Cancelled),
                        _ = tokio::time::sleep(self.delay) => {}
                    }
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_transient() {
                        tracing::error!("All {} attempts failed for {}", self.max_attempts, what);
                    }
                    return Err(e);
                }
            }
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.attempts, Duration::from_millis(config.delay_ms))
    }
}
