//! Pure firing decision.
//!
//! The poller is only guaranteed to run *about* every 30 seconds, so every
//! time comparison uses an explicit tolerance window instead of assuming
//! tick precision. Keeping the decision a pure function of `(now, alarm)`
//! lets the windows be tested exhaustively without timers.

use chrono::{DateTime, Datelike, Local, Timelike};

use crate::alarms::Alarm;

/// Seconds into the matching minute during which a normal ring still fires.
pub const FIRE_TOLERANCE_SECS: u32 = 15;

/// Seconds past `snooze_until` during which the snooze wakeup still fires.
/// Guards a late tick or a clock jump from ringing hours after the fact.
pub const SNOOZE_TOLERANCE_SECS: i64 = 15;

/// What the scheduler must do with one alarm right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireDecision {
    /// Nothing to do.
    Skip,
    /// Normal time/day match: fire.
    Ring,
    /// A pending snooze expired: fire as a snooze wakeup.
    SnoozeWakeup,
}

/// ISO weekday for `now`, 1=Monday .. 7=Sunday.
#[must_use]
pub fn weekday_number(now: DateTime<Local>) -> u8 {
    now.weekday().number_from_monday() as u8
}

/// Decides whether `alarm` must fire at `now`.
///
/// Disabled alarms never fire. A due snooze takes precedence over the
/// normal time/day match.
#[must_use]
pub fn evaluate(now: DateTime<Local>, alarm: &Alarm) -> FireDecision {
    if !alarm.enabled {
        return FireDecision::Skip;
    }

    if let Some(snooze_until) = alarm.snooze_until {
        let elapsed = now.signed_duration_since(snooze_until).num_seconds();
        if (0..SNOOZE_TOLERANCE_SECS).contains(&elapsed) {
            return FireDecision::SnoozeWakeup;
        }
    }

    if should_ring(now, alarm) {
        FireDecision::Ring
    } else {
        FireDecision::Skip
    }
}

fn should_ring(now: DateTime<Local>, alarm: &Alarm) -> bool {
    if now.hour() != u32::from(alarm.time.hour) || now.minute() != u32::from(alarm.time.minute) {
        return false;
    }
    if now.second() >= FIRE_TOLERANCE_SECS {
        return false;
    }
    alarm.is_one_shot() || alarm.repeats_on(weekday_number(now))
}

// ============================================================================
// Tests
// ============================================================================
