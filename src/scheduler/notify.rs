//! Alarm-firing notification collaborator.
//!
//! Surfacing a firing alarm to the user (screen, push, whatever the host
//! provides) is best-effort: a missing or failing handler is logged and
//! never rolls back the firing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tracing::info;
use uuid::Uuid;

use crate::alarms::Alarm;

/// Best-effort UI surfacing of a firing alarm.
pub trait AlarmNotifier: Send + Sync {
    /// Notifies the user that `alarm` is firing.
    fn notify_alarm_firing(&self, alarm: &Alarm) -> Result<(), String>;
}

/// Default notifier: writes the firing to the log.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl AlarmNotifier for LogNotifier {
    fn notify_alarm_firing(&self, alarm: &Alarm) -> Result<(), String> {
        info!(id = %alarm.id, label = alarm.label.as_str(), time = %alarm.time, "Alarm firing");
        Ok(())
    }
}

/// Mock notifier for tests.
#[derive(Debug, Default)]
pub struct MockNotifier {
    notified: Mutex<Vec<Uuid>>,
    should_fail: AtomicBool,
}

impl MockNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }

    /// Returns the ids of alarms notified, in order.
    #[must_use]
    pub fn notified(&self) -> Vec<Uuid> {
        self.notified.lock().unwrap().clone()
    }
}

impl AlarmNotifier for MockNotifier {
    fn notify_alarm_firing(&self, alarm: &Alarm) -> Result<(), String> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err("mock notification failure".to_string());
        }
        self.notified.lock().unwrap().push(alarm.id);
        Ok(())
    }
}
