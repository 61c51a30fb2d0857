//! Injected time source for the registry engine.
//!
//! The stores never read the system time directly. Every component that
//! needs "now" holds an `Arc<dyn Clock>` supplied at construction, so tests
//! drive expiry deterministically with [`ManualClock`] instead of sleeping
//! through real timeouts.

use std::fmt;
use std::sync::Mutex;

use chrono::{DateTime, TimeDelta, Utc};

/// A source of the current instant.
///
/// Implementations must be cheap and non-blocking; the stores call
/// [`now`](Clock::now) while holding their write lock.
pub trait Clock: fmt::Debug + Send + Sync {
    /// Return the current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Test clock that only moves when told to.
///
/// Shared between a test and the stores it constructs via `Arc`, so a single
/// [`advance`](Self::advance) is observed by every component.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a manual clock starting at the given instant.
    pub const fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Create a manual clock starting at the Unix epoch.
    pub fn epoch() -> Self {
        Self::new(DateTime::<Utc>::UNIX_EPOCH)
    }

    /// Advance the clock by the given delta.
    pub fn advance(&self, delta: TimeDelta) {
        let mut guard = self.now.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = guard.checked_add_signed(delta).unwrap_or(*guard);
    }

    /// Set the clock to an absolute instant.
    pub fn set(&self, instant: DateTime<Utc>) {
        let mut guard = self.now.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = instant;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self
            .now
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_holds_still_until_advanced() {
        let clock = ManualClock::epoch();
        let before = clock.now();
        assert_eq!(clock.now(), before);

        clock.advance(TimeDelta::seconds(30));
        assert_eq!(
            clock.now().signed_duration_since(before),
            TimeDelta::seconds(30)
        );
    }

    #[test]
    fn manual_clock_can_be_set_absolutely() {
        let clock = ManualClock::epoch();
        let target = DateTime::<Utc>::UNIX_EPOCH
            .checked_add_signed(TimeDelta::days(1))
            .unwrap();
        clock.set(target);
        assert_eq!(clock.now(), target);
    }

    #[test]
    fn system_clock_is_non_decreasing() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
