//! In-memory per-client rate limiter using governor crate.

use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use governor::clock::{Clock, DefaultClock};
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter as GovernorRateLimiter};

use quill_core::ports::{RateLimitError, RateLimitResult, RateLimiter};

type KeyedRateLimiter = GovernorRateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Number of checks between sweeps of idle client entries.
const PRUNE_EVERY: u64 = 1024;

/// In-memory rate limiter configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window, per client.
    pub max_requests: u32,
    /// Window duration.
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 60,
            window: Duration::from_secs(60),
        }
    }
}

/// Per-client rate limiter using the GCRA algorithm.
///
/// Note: Limits are per-process, not distributed across instances.
pub struct InMemoryRateLimiter {
    limiter: KeyedRateLimiter,
    clock: DefaultClock,
    checks: AtomicU64,
    prune_every: u64,
}

impl InMemoryRateLimiter {
    pub fn new(config: RateLimitConfig) -> Result<Self, RateLimitError> {
        let burst = NonZeroU32::new(config.max_requests)
            .ok_or_else(|| RateLimitError::Backend("max_requests must be non-zero".into()))?;
        let quota = Quota::with_period(config.window / burst.get())
            .ok_or_else(|| RateLimitError::Backend("window must be non-zero".into()))?
            .allow_burst(burst);

        Ok(Self {
            limiter: KeyedRateLimiter::keyed(quota),
            clock: DefaultClock::default(),
            checks: AtomicU64::new(0),
            prune_every: PRUNE_EVERY,
        })
    }

    /// Drop clients whose quota has fully replenished. Returns the number of
    /// clients still tracked.
    pub fn prune(&self) -> usize {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();

        let tracked = self.limiter.len();
        tracing::debug!(tracked, "Pruned idle rate limit entries");
        tracked
    }
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn check(&self, key: &str) -> Result<RateLimitResult, RateLimitError> {
        let seen = self.checks.fetch_add(1, Ordering::Relaxed) + 1;
        if seen % self.prune_every == 0 {
            self.prune();
        }

        match self.limiter.check_key(&key.to_string()) {
            Ok(()) => Ok(RateLimitResult {
                allowed: true,
                retry_after: Duration::ZERO,
            }),
            Err(not_until) => Ok(RateLimitResult {
                allowed: false,
                retry_after: not_until.wait_time_from(self.clock.now()),
            }),
        }
    }
}
