use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Spacing between consecutive calls to a rate-limited provider.
#[async_trait]
pub trait CallPacer: Send + Sync {
    /// Waits until the next call is allowed. The first call never waits.
    async fn pace(&self);
}

pub struct FixedIntervalPacer {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl FixedIntervalPacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }

    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }
}

#[async_trait]
impl CallPacer for FixedIntervalPacer {
    async fn pace(&self) {
        let mut last = self.last.lock().await;
        if let Some(previous) = *last {
            tokio::time::sleep_until(previous + self.interval).await;
        }
        *last = Some(Instant::now());
    }
}

/// No spacing at all; used where the provider has no rate limit.
pub struct NoPacing;

#[async_trait]
impl CallPacer for NoPacing {
    async fn pace(&self) {}
}
