use super::retry::RetryPolicy;
use std::time::Duration;

/// Tunables for `PaymentEngine`.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Policy for every short storage step (create, debit, finalize, refund).
    pub retry: RetryPolicy,
    /// Upper bound on a single receiving-party call. Elapsing counts as a refusal.
    pub receiver_timeout: Duration,
    /// How long a replayed request waits for a concurrent owner to settle
    /// a still-pending record before returning it as is.
    pub replay_wait: Duration,
    pub replay_poll: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            receiver_timeout: Duration::from_secs(5),
            replay_wait: Duration::from_secs(5),
            replay_poll: Duration::from_millis(20),
        }
    }
}
