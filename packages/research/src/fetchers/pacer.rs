//! Per-family request pacing.
//!
//! Each external source family has its own courtesy interval. The pacer is
//! an explicit object injected into the fetcher that owns it; cloning shares
//! the underlying clock, so concurrent fetchers for the same family still
//! serialize on one shared limiter. Tests inject [`FetchPacer::unlimited`].

use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Enforces a minimum interval between requests to one source family.
#[derive(Clone)]
pub struct FetchPacer {
    limiter: Option<Arc<DirectLimiter>>,
}

impl FetchPacer {
    /// Pacer allowing at most one request per `interval`.
    pub fn with_min_interval(interval: Duration) -> Self {
        let quota = Quota::with_period(interval).unwrap_or_else(|| Quota::per_second(nonzero!(1u32)));
        Self {
            limiter: Some(Arc::new(RateLimiter::direct(quota))),
        }
    }

    /// Pacer that never waits, for tests.
    pub fn unlimited() -> Self {
        Self { limiter: None }
    }

    /// Wait until the family's next request slot is available.
    pub async fn pace(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

impl std::fmt::Debug for FetchPacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchPacer")
            .field("limited", &self.limiter.is_some())
            .finish()
    }
}
