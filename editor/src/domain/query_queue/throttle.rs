//! Shared cooldown gate for outbound requests.
//!
//! Callers queue on an async mutex, which grants access in arrival order.
//! The holder waits out the cooldown since the previous grant, and keeps
//! the gate until its permit drops, so at most one request is in flight.

use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};
use tokio::time::{Instant, sleep_until};
use tracing::debug;

/// Default minimum spacing between requests.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(1500);

/// FIFO request gate with a fixed cooldown.
#[derive(Debug)]
pub struct Throttle {
    cooldown: Duration,
    last_grant: Mutex<Option<Instant>>,
}

/// Exclusive right to issue one request. Drop it when the request finishes.
#[derive(Debug)]
pub struct ThrottlePermit<'a> {
    _guard: MutexGuard<'a, Option<Instant>>,
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

impl Throttle {
    /// Gate with the given cooldown.
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_grant: Mutex::new(None),
        }
    }

    /// Configured cooldown.
    pub const fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Wait for a turn and for the cooldown to elapse.
    pub async fn acquire(&self) -> ThrottlePermit<'_> {
        let mut guard = self.last_grant.lock().await;
        if let Some(last) = *guard {
            let ready_at = last + self.cooldown;
            let now = Instant::now();
            if ready_at > now {
                debug!(wait = ?(ready_at - now), "throttling request");
                sleep_until(ready_at).await;
            }
        }
        *guard = Some(Instant::now());
        ThrottlePermit { _guard: guard }
    }
}

#[cfg(test)]
mod tests {
    //! Timing coverage under a paused clock.

    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn first_acquire_is_immediate() {
        let throttle = Throttle::new(Duration::from_secs(2));
        let start = Instant::now();
        drop(throttle.acquire().await);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn consecutive_acquires_are_spaced_by_cooldown() {
        let throttle = Throttle::new(Duration::from_millis(1500));
        let start = Instant::now();

        drop(throttle.acquire().await);
        drop(throttle.acquire().await);
        drop(throttle.acquire().await);

        assert!(start.elapsed() >= Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn waiters_are_served_in_arrival_order() {
        let throttle = Arc::new(Throttle::new(Duration::from_millis(100)));
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let held = throttle.acquire().await;

        let mut handles = Vec::new();
        for index in 0..3 {
            let throttle = Arc::clone(&throttle);
            let order = Arc::clone(&order);
            handles.push(tokio::spawn(async move {
                let _permit = throttle.acquire().await;
                order.lock().expect("order lock").push(index);
            }));
            tokio::task::yield_now().await;
        }
        drop(held);
        for handle in handles {
            handle.await.expect("task completes");
        }

        assert_eq!(*order.lock().expect("order lock"), vec![0, 1, 2]);
    }
}
