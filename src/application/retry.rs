use crate::error::Result;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Delay before the next attempt, given the number of attempts already made.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    None,
    /// `step * attempt`
    Linear(Duration),
}

impl Backoff {
    pub fn delay(&self, attempt: u32) -> Duration {
        match self {
            Backoff::None => Duration::ZERO,
            Backoff::Linear(step) => step.saturating_mul(attempt),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::Linear(Duration::from_millis(30)),
        }
    }
}

/// Runs `operation` until it succeeds, fails with a non-conflict error, or
/// `policy.max_attempts` attempts have hit `PaymentError::WriteConflict`.
///
/// Every attempt must start from a fresh read: the closure is called again,
/// never the same future.
pub async fn retry_on_conflict<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match operation().await {
            Err(e) if e.is_conflict() && attempt < max_attempts => {
                let delay = policy.backoff.delay(attempt);
                debug!(attempt, ?delay, "write conflict, retrying");
                tokio::time::sleep(delay).await;
            }
            Err(e) if e.is_conflict() => {
                warn!(attempt, "write conflict persisted, giving up");
                return Err(e);
            }
            other => return other,
        }
    }
}
