use std::time::Duration;

const DEFAULT_MAX_ATTEMPTS: u32 = 15;
const DEFAULT_RETRY_DELAY_MS: u64 = 1_000;

/// Fixed-interval, bounded retry budget for status polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    retry_delay_ms: u64,
}

impl RetryPolicy {
    /// Create a policy (`max_attempts >= 1`).
    pub fn new(max_attempts: u32, retry_delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            retry_delay_ms,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn retry_delay_ms(&self) -> u64 {
        self.retry_delay_ms
    }

    /// Delay before the next status check. Constant; attempts do not back off.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Whether `attempt` status checks have used the whole budget.
    pub fn is_exhausted(&self, attempt: u32) -> bool {
        attempt >= self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY_MS)
    }
}
