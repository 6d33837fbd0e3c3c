//! Rate limiter for polite crawling.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

/// Caps concurrent visits and keeps `min_delay` between one visit's start
/// and the next, and between one visit's end and the next start.
pub struct RateLimiter {
    semaphore: Arc<Semaphore>,
    min_delay: Duration,
    /// Earliest instant the next visit may start.
    ready_at: Arc<Mutex<Option<Instant>>>,
}

impl RateLimiter {
    pub fn new(max_concurrent: usize, min_delay: Duration) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            min_delay,
            ready_at: Arc::new(Mutex::new(None)),
        }
    }

    /// Wait for a free slot and for the politeness delay to elapse.
    pub async fn acquire(&self) -> Result<RateLimitGuard, AcquireError> {
        let permit = self.semaphore.clone().acquire_owned().await?;

        let slot = {
            let mut ready_at = self.ready_at.lock().unwrap_or_else(|e| e.into_inner());
            let now = Instant::now();
            let slot = ready_at.map_or(now, |t| t.max(now));
            *ready_at = Some(slot + self.min_delay);
            slot
        };
        tokio::time::sleep_until(slot).await;

        Ok(RateLimitGuard {
            _permit: permit,
            ready_at: self.ready_at.clone(),
            min_delay: self.min_delay,
        })
    }
}

/// Held for the duration of one visit. Dropping it releases the slot and
/// starts the post-visit delay.
pub struct RateLimitGuard {
    _permit: OwnedSemaphorePermit,
    ready_at: Arc<Mutex<Option<Instant>>>,
    min_delay: Duration,
}

impl Drop for RateLimitGuard {
    fn drop(&mut self) {
        let mut ready_at = self.ready_at.lock().unwrap_or_else(|e| e.into_inner());
        let after_visit = Instant::now() + self.min_delay;
        *ready_at = Some(ready_at.map_or(after_visit, |t| t.max(after_visit)));
    }
}
