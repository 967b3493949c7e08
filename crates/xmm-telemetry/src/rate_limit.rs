//! Token-bucket rate limiting.
//!
//! Used for pacing noisy side effects: circuit-breaker alerts, profit
//! reports, and the hedge-error cooldown. `allow` is the cheap non-blocking
//! check; `reserve` always takes a token and tells the caller how long to
//! wait before acting on it.

use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// A claimed token and the delay before it becomes valid.
#[derive(Debug, Clone, Copy)]
pub struct Reservation {
    delay: Duration,
}

impl Reservation {
    /// Time to wait from the moment of reservation.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Whether the token was immediately available.
    pub fn ready(&self) -> bool {
        self.delay.is_zero()
    }
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket: one token per `interval`, holding at most `burst` tokens.
#[derive(Debug)]
pub struct TokenBucket {
    interval: Duration,
    burst: u32,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    pub fn new(interval: Duration, burst: u32) -> Self {
        Self {
            interval,
            burst: burst.max(1),
            state: Mutex::new(BucketState {
                tokens: burst.max(1) as f64,
                last_refill: Instant::now(),
            }),
        }
    }

    fn refill(&self, state: &mut BucketState, now: Instant) {
        if self.interval.is_zero() {
            state.tokens = self.burst as f64;
            return;
        }
        let elapsed = now.duration_since(state.last_refill);
        let gained = elapsed.as_secs_f64() / self.interval.as_secs_f64();
        state.tokens = (state.tokens + gained).min(self.burst as f64);
        state.last_refill = now;
    }

    /// Take a token if one is available right now.
    pub fn allow(&self, now: Instant) -> bool {
        let mut state = self.state.lock();
        self.refill(&mut state, now);
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Take a token unconditionally; the reservation carries the wait until
    /// the token is actually due.
    pub fn reserve(&self, now: Instant) -> Reservation {
        let mut state = self.state.lock();
        self.refill(&mut state, now);

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            return Reservation {
                delay: Duration::ZERO,
            };
        }

        let deficit = 1.0 - state.tokens;
        state.tokens -= 1.0;
        Reservation {
            delay: self.interval.mul_f64(deficit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_then_deny() {
        let bucket = TokenBucket::new(Duration::from_secs(60), 2);
        let now = Instant::now();

        assert!(bucket.allow(now));
        assert!(bucket.allow(now));
        assert!(!bucket.allow(now));
    }

    #[test]
    fn test_refills_over_time() {
        let bucket = TokenBucket::new(Duration::from_secs(60), 1);
        let start = Instant::now();

        assert!(bucket.allow(start));
        assert!(!bucket.allow(start + Duration::from_secs(30)));
        assert!(bucket.allow(start + Duration::from_secs(61)));
    }

    #[test]
    fn test_reservation_delay() {
        let bucket = TokenBucket::new(Duration::from_secs(60), 1);
        let now = Instant::now();

        let first = bucket.reserve(now);
        assert!(first.ready());

        let second = bucket.reserve(now);
        assert!(!second.ready());
        assert!(second.delay() > Duration::from_secs(59));
        assert!(second.delay() <= Duration::from_secs(61));
    }

    #[test]
    fn test_capacity_never_exceeds_burst() {
        let bucket = TokenBucket::new(Duration::from_secs(1), 2);
        let start = Instant::now();

        // A long idle period still refills to burst, no further.
        let later = start + Duration::from_secs(100);
        assert!(bucket.allow(later));
        assert!(bucket.allow(later));
        assert!(!bucket.allow(later));
    }
}
