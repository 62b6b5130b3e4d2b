//! Bounded retry with linear backoff for single-address verification calls.

use crate::core::error::Result;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// How many extra attempts a failed call gets and how long to wait between them.
///
/// Attempt `n` (1-based, counting retries only) waits `base_backoff * n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, Duration::from_millis(500))
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_backoff: Duration) -> Self {
        Self {
            max_retries,
            base_backoff,
        }
    }

    /// Same attempt count as the default, without waiting between attempts.
    pub fn immediate() -> Self {
        Self::new(2, Duration::ZERO)
    }

    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    pub fn backoff_for(&self, retry: u32) -> Duration {
        self.base_backoff.saturating_mul(retry)
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable error, or
    /// the retry budget is spent. The last error is returned.
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut retry = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && retry < self.max_retries => {
                    retry += 1;
                    let wait = self.backoff_for(retry);
                    tracing::debug!(
                        target: "orchestrator",
                        "{} Attempt {} failed ({}), retrying in {:?}",
                        label,
                        retry,
                        e,
                        wait
                    );
                    if !wait.is_zero() {
                        sleep(wait).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}
