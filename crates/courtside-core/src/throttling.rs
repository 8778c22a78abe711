use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Enforces a minimum interval between outgoing requests.
///
/// Clones share one limiter, so every worker of a fetch client draws from the
/// same budget.
#[derive(Clone)]
pub struct RequestPacer {
    limiter: Arc<DirectRateLimiter>,
    interval: Duration,
}

impl std::fmt::Debug for RequestPacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestPacer")
            .field("interval", &self.interval)
            .finish()
    }
}

impl RequestPacer {
    /// `None` when `min_interval` is zero, which disables pacing.
    pub fn new(min_interval: Duration) -> Option<Self> {
        let quota = Quota::with_period(min_interval)?.allow_burst(NonZeroU32::MIN);
        Some(Self {
            limiter: Arc::new(RateLimiter::direct(quota)),
            interval: min_interval,
        })
    }

    pub fn from_millis(min_interval_ms: u64) -> Option<Self> {
        Self::new(Duration::from_millis(min_interval_ms))
    }

    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until the next request may be sent.
    pub async fn ready(&self) {
        self.limiter.until_ready().await;
    }

    /// Take a slot without waiting. `false` when the interval has not elapsed.
    pub fn try_ready(&self) -> bool {
        self.limiter.check().is_ok()
    }
}
