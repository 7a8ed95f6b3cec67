//! Global rate limiter for Scryfall API calls.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Spaces calls by at least `min_interval`, across any number of threads.
///
/// Each caller reserves the next free slot under the lock, then sleeps outside
/// it until that slot arrives. Waiters are not served strictly FIFO; only the
/// rate matters. Cache hits never touch this, only requests that actually go
/// to the API.
pub struct RateLimiter {
    min_interval: Duration,
    next_allowed: Mutex<Instant>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_allowed: Mutex::new(Instant::now()),
        }
    }

    /// Blocks the calling worker until its reserved slot arrives.
    pub fn wait(&self) {
        let slot = {
            let mut next = self.next_allowed.lock().expect("rate limiter poisoned");
            let now = Instant::now();
            let slot = if *next > now { *next } else { now };
            *next = slot + self.min_interval;
            slot
        };
        let now = Instant::now();
        if slot > now {
            std::thread::sleep(slot - now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn first_wait_is_immediate() {
        let limiter = RateLimiter::new(Duration::from_millis(200));
        let start = Instant::now();
        limiter.wait();
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn ten_waits_take_at_least_nine_intervals() {
        let limiter = RateLimiter::new(Duration::from_millis(100));
        let start = Instant::now();
        for _ in 0..10 {
            limiter.wait();
        }
        assert!(
            start.elapsed() >= Duration::from_millis(900),
            "10 calls finished in {:?}",
            start.elapsed()
        );
    }

    #[test]
    fn rate_holds_across_concurrent_callers() {
        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(50)));
        let start = Instant::now();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || {
                    for _ in 0..3 {
                        limiter.wait();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        // 12 calls total, 11 gaps of >= 50ms
        assert!(
            start.elapsed() >= Duration::from_millis(550),
            "12 concurrent calls finished in {:?}",
            start.elapsed()
        );
    }
}
