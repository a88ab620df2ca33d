//! Alarm data model and persistence.
//!
//! This module defines the persisted [`Alarm`] record and the [`AlarmStore`]
//! that holds the durable alarm list. The store is pure CRUD; all firing
//! decisions live in the scheduler.

mod error;
mod store;

pub use error::AlarmStoreError;
pub use store::{AlarmStore, ALARMS_STORAGE_KEY};

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// AlarmTime
// ============================================================================

/// Wall-clock hour and minute an alarm rings at, interpreted in local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmTime {
    /// Hour (0-23)
    pub hour: u8,
    /// Minute (0-59)
    pub minute: u8,
}

impl AlarmTime {
    /// Creates a validated alarm time.
    pub fn new(hour: u8, minute: u8) -> Result<Self, String> {
        if hour > 23 {
            return Err("時は0-23の範囲で指定してください".to_string());
        }
        if minute > 59 {
            return Err("分は0-59の範囲で指定してください".to_string());
        }
        Ok(Self { hour, minute })
    }
}

impl fmt::Display for AlarmTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for AlarmTime {
    type Err = String;

    /// Parses `"HH:MM"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (h, m) = s
            .split_once(':')
            .ok_or_else(|| "時刻はHH:MM形式で指定してください".to_string())?;
        let hour: u8 = h
            .parse()
            .map_err(|_| "時刻はHH:MM形式で指定してください".to_string())?;
        let minute: u8 = m
            .parse()
            .map_err(|_| "時刻はHH:MM形式で指定してください".to_string())?;
        Self::new(hour, minute)
    }
}

// ============================================================================
// StationRef
// ============================================================================

/// Playable-source descriptor attached to an alarm.
///
/// Carries just enough of a directory station to start playback without
/// another directory lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationRef {
    /// Directory station id.
    pub id: String,
    /// Station display name.
    pub name: String,
    /// Resolved stream URL.
    pub stream_url: String,
}

impl StationRef {
    /// Returns true if the reference carries a usable stream URL.
    #[must_use]
    pub fn is_playable(&self) -> bool {
        !self.stream_url.trim().is_empty()
    }
}

// ============================================================================
// Alarm
// ============================================================================

/// A persisted alarm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alarm {
    /// Unique identifier.
    pub id: Uuid,
    /// Ring time (local wall clock, no seconds).
    pub time: AlarmTime,
    /// Weekdays the alarm repeats on (1=Monday .. 7=Sunday).
    /// Empty set means a one-shot alarm.
    #[serde(default)]
    pub repeat_days: BTreeSet<u8>,
    /// Disabled alarms are never evaluated.
    pub enabled: bool,
    /// Pending snooze wakeup, if any. Cleared in the same update that fires
    /// the snooze wakeup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snooze_until: Option<DateTime<Local>>,
    /// User label.
    #[serde(default)]
    pub label: String,
    /// Radio station to play, or `None` to use the bundled fallback sound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub station: Option<StationRef>,
}

impl Alarm {
    /// Creates an enabled one-shot alarm with a fresh id.
    #[must_use]
    pub fn new(time: AlarmTime, label: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            time,
            repeat_days: BTreeSet::new(),
            enabled: true,
            snooze_until: None,
            label: label.into(),
            station: None,
        }
    }

    /// Attaches a station reference.
    #[must_use]
    pub fn with_station(mut self, station: StationRef) -> Self {
        self.station = Some(station);
        self
    }

    /// Sets the repeat days (1=Monday .. 7=Sunday).
    #[must_use]
    pub fn with_repeat_days(mut self, days: impl IntoIterator<Item = u8>) -> Self {
        self.repeat_days = days.into_iter().collect();
        self
    }

    /// Returns true if the alarm has no repeat days.
    #[must_use]
    pub fn is_one_shot(&self) -> bool {
        self.repeat_days.is_empty()
    }

    /// Returns true if the alarm repeats on the given ISO weekday
    /// (1=Monday .. 7=Sunday).
    #[must_use]
    pub fn repeats_on(&self, weekday: u8) -> bool {
        self.repeat_days.contains(&weekday)
    }

    /// Validates time and repeat-day ranges.
    pub fn validate(&self) -> Result<(), String> {
        AlarmTime::new(self.time.hour, self.time.minute)?;
        if let Some(day) = self.repeat_days.iter().find(|d| **d < 1 || **d > 7) {
            return Err(format!(
                "曜日は1(月)-7(日)の範囲で指定してください: {day}"
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
