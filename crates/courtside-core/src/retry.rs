//! Retry policy with exponential backoff and optional jitter.

use std::time::Duration;

/// Statuses the upstream uses for throttling and temporary outages.
pub const DEFAULT_RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Configuration for the fetch retry loop.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per work unit, including the first.
    pub max_attempts: u32,
    /// Base of the backoff: the delay after attempt `n` is `factor^n` seconds.
    pub backoff_factor: f64,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Whether to apply random jitter (+/- 50%) to the delay.
    pub jitter: bool,
    /// HTTP status codes that trigger a retry.
    pub retry_on_status: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(120),
            jitter: false,
            retry_on_status: DEFAULT_RETRY_STATUSES.to_vec(),
        }
    }
}

impl RetryPolicy {
    /// Policy with the given attempt budget and the default backoff.
    pub fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Policy that makes a single attempt.
    pub fn no_retry() -> Self {
        Self::with_attempts(1)
    }

    pub fn should_retry_status(&self, status: u16) -> bool {
        self.retry_on_status.contains(&status)
    }

    /// Whether another attempt is allowed after `attempt` (1-based) failed.
    pub fn has_attempts_after(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Delay to wait after the failed attempt `attempt` (1-based).
    pub fn delay_after_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let seconds = self.backoff_factor.powi(exponent);
        let capped_seconds = if seconds.is_finite() {
            seconds.min(self.max_delay.as_secs_f64()).max(0.0)
        } else {
            self.max_delay.as_secs_f64()
        };

        let mut delay = Duration::from_secs_f64(capped_seconds);

        if self.jitter {
            let jitter_ms = (delay.as_millis() as f64 * 0.5) as u64;
            let random_offset = fastrand::u64(0..=(jitter_ms * 2));
            let total_ms = delay.as_millis() as i64 + (random_offset as i64 - jitter_ms as i64);
            delay = Duration::from_millis(total_ms.max(0) as u64);
        }

        delay
    }
}
