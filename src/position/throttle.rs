//! Minimum-spacing throttle for outbound venue requests.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::{self, Instant};

/// Spaces calls at least `min_interval` apart.
///
/// Each caller reserves the next free slot under the lock and then sleeps
/// outside it, so concurrent callers queue up instead of bursting.
#[derive(Debug, Default)]
pub struct Throttle {
    last_slot: Mutex<Option<Instant>>,
}

impl Throttle {
    /// Create a throttle with no request recorded
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the next slot. A zero interval never waits or records.
    pub async fn wait(&self, min_interval: Duration) {
        if min_interval.is_zero() {
            return;
        }
        let delay = {
            let mut last = self.last_slot.lock();
            let now = Instant::now();
            let slot = match *last {
                Some(prev) => (prev + min_interval).max(now),
                None => now,
            };
            *last = Some(slot);
            slot - now
        };
        if !delay.is_zero() {
            time::sleep(delay).await;
        }
    }
}
