//! Alarm scheduling.
//!
//! This module contains the alarm-evaluation core:
//! - `decision`: pure "should this alarm fire now" function with explicit
//!   tolerance windows
//! - `engine`: the polling scheduler, active-alarm exclusivity, and
//!   snooze/dismiss operations
//! - `notify`: best-effort firing notification collaborator

mod decision;
mod engine;
mod notify;

pub use decision::{
    evaluate, weekday_number, FireDecision, FIRE_TOLERANCE_SECS, SNOOZE_TOLERANCE_SECS,
};
pub use engine::{
    AlarmOutcome, AlarmScheduler, SchedulerEvent, DEFAULT_TICK_INTERVAL,
};
pub use notify::{AlarmNotifier, LogNotifier, MockNotifier};
