//! Injectable time source.
//!
//! All `created_at` stamps and staleness cutoffs derive from a single
//! [`Clock`] so that one operation observes one consistent notion of "now"
//! and tests can drive time without sleeping.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

/// A source of wall-clock time.
pub trait Clock: fmt::Debug + Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// The production clock, backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to, for tests.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    /// Creates a manual clock starting at the given instant.
    #[must_use]
    pub fn starting_at(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    /// Advances the clock by the given duration.
    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }

    /// Sets the clock to an absolute instant.
    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock() = to;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::starting_at(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_advance_manual_clock() {
        let clock = ManualClock::default();
        let before = clock.now();
        clock.advance(Duration::seconds(7));
        assert_eq!(clock.now() - before, Duration::seconds(7));
    }

    #[test]
    fn test_should_share_state_between_clones() {
        let clock = ManualClock::default();
        let other = clock.clone();
        clock.advance(Duration::seconds(3));
        assert_eq!(clock.now(), other.now());
    }
}
