//! Pacing delays and bounded waits.
//!
//! Every pause the engine takes goes through a [`Pacer`], so tests can swap
//! in [`NoDelay`] without touching control flow.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::time::Instant;

use crate::app::Result;
use crate::engine::config::DelayRange;

#[async_trait]
pub trait Pacer: Send + Sync {
    /// Suspend for a duration drawn from `range`
    async fn pause(&self, range: DelayRange);
}

/// Sleeps for a uniformly random duration within the range.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomPacer;

impl RandomPacer {
    pub fn sample(range: DelayRange) -> Duration {
        let (min, max) = range.bounds();
        if min == max {
            return Duration::from_millis(min);
        }
        Duration::from_millis(rand::rng().random_range(min..=max))
    }
}

#[async_trait]
impl Pacer for RandomPacer {
    async fn pause(&self, range: DelayRange) {
        let delay = Self::sample(range);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Returns immediately; for tests and dry runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

#[async_trait]
impl Pacer for NoDelay {
    async fn pause(&self, _range: DelayRange) {}
}

/// Poll `probe` until it yields a value or `timeout` elapses.
///
/// The probe runs at least once. Returns `Ok(None)` on timeout; a probe
/// error ends the wait immediately.
pub async fn wait_for<T, F, Fut>(timeout: Duration, interval: Duration, mut probe: F) -> Result<Option<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let deadline = Instant::now() + timeout;

    loop {
        if let Some(found) = probe().await? {
            return Ok(Some(found));
        }

        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        tokio::time::sleep(interval.min(deadline - now)).await;
    }
}
