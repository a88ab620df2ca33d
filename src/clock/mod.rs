//! Injectable wall-clock time.
//!
//! All "should this alarm ring now" decisions compare against a [`Clock`]
//! rather than calling `Local::now()` directly, so the scheduler and sleep
//! timer can be driven through any point in time from tests.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Local};

/// Source of the current local time.
pub trait Clock: Send + Sync {
    /// Returns the current local time.
    fn now(&self) -> DateTime<Local>;
}

/// Production clock backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Test clock pinned to an explicit instant.
///
/// Tests set or advance the instant manually; nothing moves on its own.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Local>>,
}

impl FixedClock {
    #[must_use]
    pub fn new(now: DateTime<Local>) -> Self {
        Self { now: Mutex::new(now) }
    }

    /// Pins the clock to a new instant.
    pub fn set(&self, now: DateTime<Local>) {
        *self.now.lock().unwrap() = now;
    }

    /// Moves the clock forward (or backward, with a negative duration).
    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().unwrap();
        *guard = *guard + by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        *self.now.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_system_clock_returns_current_time() {
        let clock = SystemClock;
        let before = Local::now();
        let now = clock.now();
        let after = Local::now();
        assert!(now >= before && now <= after);
    }

    #[test]
    fn test_fixed_clock_is_pinned() {
        let instant = Local.with_ymd_and_hms(2024, 5, 1, 7, 30, 0).unwrap();
        let clock = FixedClock::new(instant);
        assert_eq!(clock.now(), instant);
        assert_eq!(clock.now(), instant);
    }

    #[test]
    fn test_fixed_clock_set_and_advance() {
        let instant = Local.with_ymd_and_hms(2024, 5, 1, 7, 30, 0).unwrap();
        let clock = FixedClock::new(instant);

        clock.advance(Duration::seconds(90));
        assert_eq!(clock.now(), instant + Duration::seconds(90));

        let later = Local.with_ymd_and_hms(2024, 5, 2, 0, 0, 5).unwrap();
        clock.set(later);
        assert_eq!(clock.now(), later);
    }
}
