//! Token-bucket rate limiter for provisioned-throughput admission.
//!
//! The bucket refills continuously against wall-clock time and never blocks:
//! `try_take` either succeeds immediately or the caller surfaces a
//! throughput-exceeded error. Time comes from the engine clock so tests can
//! drive refill deterministically.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// A non-blocking token bucket.
///
/// Capacity doubles as the burst allowance: a freshly created bucket is
/// full, so up to `capacity` tokens can be taken before refill matters.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    refill_per_second: f64,
    state: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: DateTime<Utc>,
}

impl TokenBucket {
    /// Creates a full bucket with the given capacity and refill rate.
    #[must_use]
    pub fn new(capacity: f64, refill_per_second: f64, now: DateTime<Utc>) -> Self {
        Self {
            capacity,
            refill_per_second,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: now,
            }),
        }
    }

    /// Attempts to take `tokens` tokens at time `now`.
    ///
    /// Returns `false` without consuming anything if the bucket does not
    /// currently hold enough.
    pub fn try_take(&self, tokens: f64, now: DateTime<Utc>) -> bool {
        let mut state = self.state.lock();

        let elapsed = (now - state.last_refill).num_milliseconds();
        if elapsed > 0 {
            #[allow(clippy::cast_precision_loss)]
            let refill = self.refill_per_second * (elapsed as f64 / 1000.0);
            state.tokens = (state.tokens + refill).min(self.capacity);
            state.last_refill = now;
        }

        if state.tokens >= tokens {
            state.tokens -= tokens;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn test_should_allow_initial_burst_up_to_capacity() {
        let now = Utc::now();
        let bucket = TokenBucket::new(3.0, 1.0, now);
        assert!(bucket.try_take(1.0, now));
        assert!(bucket.try_take(1.0, now));
        assert!(bucket.try_take(1.0, now));
        assert!(!bucket.try_take(1.0, now));
    }

    #[test]
    fn test_should_refill_over_time() {
        let now = Utc::now();
        let bucket = TokenBucket::new(1.0, 1.0, now);
        assert!(bucket.try_take(1.0, now));
        assert!(!bucket.try_take(1.0, now));

        // Half a second refills half a token.
        assert!(!bucket.try_take(1.0, now + Duration::milliseconds(500)));
        assert!(bucket.try_take(1.0, now + Duration::milliseconds(1500)));
    }

    #[test]
    fn test_should_cap_refill_at_capacity() {
        let now = Utc::now();
        let bucket = TokenBucket::new(2.0, 1.0, now);
        // A long idle period must not accumulate more than the capacity.
        let later = now + Duration::seconds(3600);
        assert!(bucket.try_take(2.0, later));
        assert!(!bucket.try_take(1.0, later));
    }

    #[test]
    fn test_should_reject_oversized_request_without_draining() {
        let now = Utc::now();
        let bucket = TokenBucket::new(2.0, 1.0, now);
        assert!(!bucket.try_take(5.0, now));
        // The failed attempt consumed nothing.
        assert!(bucket.try_take(2.0, now));
    }
}
