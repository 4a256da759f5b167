//! Shared rate-token source for remote search calls.
//!
//! The remote API enforces a hard quota, so every worker must acquire a token
//! before each remote call; cache hits bypass the governor entirely. The
//! governor is a plain periodic tick, not a token bucket: tokens are never
//! buffered beyond one outstanding tick, and no burst credit accumulates
//! while nobody is consuming.

use tokio::sync::Mutex;
use tokio::time::{interval, Interval, MissedTickBehavior};

use pipeline::RateLimit;

/// Emits one permission token per `1 / rate-limit` minutes, shared by all
/// workers.
///
/// The first token is available immediately; every subsequent token arrives
/// one period after the previous one was consumed or became due. Waiters are
/// served one at a time in acquisition order.
pub struct RateGovernor {
    ticker: Mutex<Interval>,
}

impl RateGovernor {
    /// Creates a governor ticking at the configured rate.
    pub fn new(limit: RateLimit) -> Self {
        let mut ticker = interval(limit.period());
        // Delay, not Burst: ticks skipped while every worker was busy must
        // not be redeemable later.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            ticker: Mutex::new(ticker),
        }
    }

    /// Waits for the next rate token.
    ///
    /// Holding the internal lock across the tick serialises concurrent
    /// waiters, so N acquisitions always span at least N-1 periods.
    pub async fn acquire(&self) {
        self.ticker.lock().await.tick().await;
    }
}
