//! Logical clocks for the replay host

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

/// Source of host time and durable-timer waits
#[async_trait]
pub trait LogicalClock: Send + Sync {
    /// Current host time
    fn now(&self) -> DateTime<Utc>;

    /// Return once `fire_at` has been reached
    async fn sleep_until(&self, fire_at: DateTime<Utc>);
}

/// Wall-clock time with real sleeps
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl LogicalClock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep_until(&self, fire_at: DateTime<Utc>) {
        if let Ok(delay) = (fire_at - Utc::now()).to_std() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Manually driven time; timers fire instantly by jumping forward
#[derive(Debug)]
pub struct VirtualClock {
    now: Mutex<DateTime<Utc>>,
}

impl VirtualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move time forward by `by`
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

#[async_trait]
impl LogicalClock for VirtualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }

    async fn sleep_until(&self, fire_at: DateTime<Utc>) {
        let mut now = self.now.lock();
        if fire_at > *now {
            *now = fire_at;
        }
    }
}
