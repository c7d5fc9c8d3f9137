use std::sync::Mutex;
use std::time::Instant;

struct Bucket {
    capacity: f64,
    refill_per_second: f64,
    tokens: f64,
    last_refill: Instant,
}

/// Per-session token bucket over host->client binary bytes. Bucket capacity
/// equals the configured bytes/second rate (a one-second burst). Clock
/// regressions are treated as zero elapsed, never negative refill.
pub struct RateLimiter {
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    pub fn new(bytes_per_second: u64) -> Self {
        let rate = bytes_per_second as f64;
        Self {
            bucket: Mutex::new(Bucket {
                capacity: rate,
                refill_per_second: rate,
                tokens: rate,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Refills from elapsed wall time, caps at capacity, then atomically
    /// deducts `amount` if available. Leaves the bucket unchanged and
    /// returns `false` if insufficient tokens are present.
    pub fn allow(&self, amount: u64) -> bool {
        let mut bucket = self.bucket.lock().expect("rate limiter mutex poisoned");
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(bucket.last_refill).as_secs_f64();
        bucket.last_refill = now;
        bucket.tokens = (bucket.tokens + elapsed * bucket.refill_per_second).min(bucket.capacity);

        let amount = amount as f64;
        if bucket.tokens >= amount {
            bucket.tokens -= amount;
            true
        } else {
            false
        }
    }

    pub fn capacity(&self) -> u64 {
        self.bucket.lock().expect("rate limiter mutex poisoned").capacity as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn allow_denies_once_capacity_is_exhausted() {
        let limiter = RateLimiter::new(10);
        assert!(limiter.allow(10));
        assert!(!limiter.allow(1));
    }

    #[test]
    fn allow_refills_from_elapsed_wall_time() {
        let limiter = RateLimiter::new(1000);
        assert!(limiter.allow(1000));
        assert!(!limiter.allow(1));
        sleep(Duration::from_millis(50));
        assert!(limiter.allow(40));
    }

    #[test]
    fn allow_never_exceeds_capacity_even_after_long_idle() {
        let limiter = RateLimiter::new(100);
        assert!(limiter.allow(100));
        sleep(Duration::from_millis(20));
        assert!(!limiter.allow(101));
    }

    #[test]
    fn capacity_reports_configured_rate() {
        let limiter = RateLimiter::new(65_536);
        assert_eq!(limiter.capacity(), 65_536);
    }
}
