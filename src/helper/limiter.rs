//! Call-rate ceiling for the helper channel.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// A token bucket with a burst of one that blocks callers instead of
/// rejecting them.
///
/// Bounds how fast an unprivileged, possibly buggy, caller can hammer the
/// privileged helper. Waiters are serialized through the internal lock, so
/// concurrent callers drain at exactly one call per interval.
pub struct CallLimiter {
    interval: Duration,
    next_free: Mutex<Option<Instant>>,
}

impl CallLimiter {
    /// Create a limiter releasing one token per `interval`.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_free: Mutex::new(None),
        }
    }

    /// Wait until a token is available and consume it.
    pub async fn acquire(&self) {
        // The lock is held across the sleep on purpose: the next caller
        // queues here until the current one has taken its slot.
        let mut next_free = self.next_free.lock().await;
        let now = Instant::now();
        let start = match *next_free {
            Some(at) if at > now => {
                tokio::time::sleep_until(at).await;
                at
            }
            _ => now,
        };
        *next_free = Some(start.checked_add(self.interval).unwrap_or(start));
    }
}
