//! Alarm scheduler.
//!
//! Polls the alarm list on a fixed cadence, decides which alarm (if any)
//! must fire now, and drives the playback engine. Firing is mutually
//! exclusive: exactly one alarm may be sounding system-wide, and a second
//! trigger while one is active is dropped — logged and reported, never
//! queued.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::alarms::{Alarm, AlarmStore};
use crate::audio::{AudioSource, EngineEvent, PlaybackEngine};
use crate::clock::Clock;
use crate::report::ErrorReporter;

use super::decision::{evaluate, FireDecision};
use super::notify::AlarmNotifier;

/// Default evaluation cadence.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(30);

/// Context label used for reported scheduler failures.
const REPORT_CONTEXT: &str = "alarm-scheduler";

/// Capacity of the scheduler event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

// ============================================================================
// Events and outcomes
// ============================================================================

/// Scheduler state changes, broadcast to subscribers (UI layer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerEvent {
    /// An alarm started sounding.
    AlarmFired {
        /// Alarm id
        id: Uuid,
        /// True when triggered by snooze expiry rather than time/day match
        snooze_wakeup: bool,
    },
    /// A due alarm was dropped because another alarm was already sounding.
    FiringDropped {
        /// Alarm id
        id: Uuid,
    },
    /// The sounding alarm stopped (dismissed, snoozed, or its audio ended).
    AlarmStopped {
        /// Alarm id
        id: Uuid,
    },
}

/// Per-alarm evaluation outcome, aggregated by [`AlarmScheduler::check_all`].
///
/// One malfunctioning alarm must never block evaluation of the others, so
/// each alarm reports its own outcome instead of short-circuiting the pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlarmOutcome {
    /// Not due; nothing happened.
    Skipped,
    /// The alarm fired and is now sounding.
    Fired {
        /// True when fired by snooze expiry
        snooze_wakeup: bool,
    },
    /// Due, but another alarm was already sounding; dropped.
    DroppedBusy,
    /// Due, but the audio source could not be started.
    PlaybackFailed,
    /// The alarm could not be evaluated or persisted.
    Error(String),
}

/// Sole owner of the "which alarm is sounding" fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActiveAlarm {
    Idle,
    Sounding { id: Uuid },
}

// ============================================================================
// AlarmScheduler
// ============================================================================

/// The alarm-evaluation state machine.
pub struct AlarmScheduler {
    store: Arc<AlarmStore>,
    engine: Arc<dyn PlaybackEngine>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn AlarmNotifier>,
    reporter: Arc<dyn ErrorReporter>,
    active: Mutex<ActiveAlarm>,
    events: broadcast::Sender<SchedulerEvent>,
    tick_interval: Duration,
}

impl AlarmScheduler {
    /// Creates a scheduler with the default 30-second cadence.
    #[must_use]
    pub fn new(
        store: Arc<AlarmStore>,
        engine: Arc<dyn PlaybackEngine>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn AlarmNotifier>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            engine,
            clock,
            notifier,
            reporter,
            active: Mutex::new(ActiveAlarm::Idle),
            events,
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }

    /// Overrides the evaluation cadence (tests).
    #[must_use]
    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    /// Subscribes to scheduler state changes.
    pub fn subscribe(&self) -> broadcast::Receiver<SchedulerEvent> {
        self.events.subscribe()
    }

    /// Returns the id of the currently sounding alarm, if any.
    #[must_use]
    pub fn active_alarm_id(&self) -> Option<Uuid> {
        match *self.active.lock().unwrap() {
            ActiveAlarm::Idle => None,
            ActiveAlarm::Sounding { id } => Some(id),
        }
    }

    /// Runs the evaluation loop.
    ///
    /// Ticks on the configured cadence and additionally re-evaluates
    /// immediately whenever `wake_rx` delivers a foreground/wake signal.
    /// Spawn as a tokio task.
    pub async fn run(self: Arc<Self>, mut wake_rx: mpsc::Receiver<()>) {
        let mut ticker = interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut engine_events = self.engine.subscribe();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_all().await;
                }
                Some(()) = wake_rx.recv() => {
                    debug!("Wake signal: immediate evaluation pass");
                    self.check_all().await;
                }
                event = engine_events.recv() => match event {
                    Ok(EngineEvent::Finished) => self.unwind_active("audio finished"),
                    Ok(EngineEvent::Failed(reason)) => {
                        self.reporter.report(REPORT_CONTEXT, &reason);
                        self.unwind_active("audio failed");
                    }
                    Ok(EngineEvent::Started) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Scheduler lagged behind engine events");
                    }
                    Err(broadcast::error::RecvError::Closed) => return,
                },
            }
        }
    }

    /// Evaluates every persisted alarm once, independently.
    ///
    /// A store-read failure skips the whole pass (reported); a failure in
    /// one alarm is contained in its own outcome.
    pub async fn check_all(&self) -> Vec<(Uuid, AlarmOutcome)> {
        let alarms = match self.store.list() {
            Ok(alarms) => alarms,
            Err(e) => {
                self.reporter.report(REPORT_CONTEXT, &e);
                return Vec::new();
            }
        };

        let mut outcomes = Vec::with_capacity(alarms.len());
        for alarm in &alarms {
            let outcome = self.check_and_update_alarm(alarm).await;
            outcomes.push((alarm.id, outcome));
        }
        outcomes
    }

    /// Evaluates a single alarm and fires it when due.
    ///
    /// Exposed standalone so an external wake (e.g. push-driven) can force
    /// an immediate evaluation outside the tick cadence.
    pub async fn check_and_update_alarm(&self, alarm: &Alarm) -> AlarmOutcome {
        match evaluate(self.clock.now(), alarm) {
            FireDecision::Skip => AlarmOutcome::Skipped,
            FireDecision::SnoozeWakeup => {
                // The snooze is consumed in the same logical update that
                // triggers the firing; it must never stay set past this
                // point.
                if let Err(e) = self.store.clear_snooze(alarm.id) {
                    self.reporter.report(REPORT_CONTEXT, &e);
                    return AlarmOutcome::Error(e.to_string());
                }
                self.fire(alarm, true).await
            }
            FireDecision::Ring => self.fire(alarm, false).await,
        }
    }

    /// Stops the currently sounding alarm, if any.
    pub fn dismiss_active(&self) -> Option<Uuid> {
        let id = self.take_active()?;
        self.engine.stop();
        info!(%id, "Alarm dismissed");
        let _ = self.events.send(SchedulerEvent::AlarmStopped { id });
        Some(id)
    }

    /// Postpones the currently sounding alarm by `minutes` and stops its
    /// audio. `0` minutes is a logged no-op.
    pub fn snooze_active(&self, minutes: u32) -> Result<Option<Uuid>, crate::alarms::AlarmStoreError> {
        if minutes == 0 {
            warn!("Ignoring snooze request with zero duration");
            return Ok(None);
        }
        let Some(id) = self.active_alarm_id() else {
            return Ok(None);
        };

        let until = self.clock.now() + chrono::Duration::minutes(i64::from(minutes));
        self.store.set_snooze(id, Some(until))?;

        self.take_active();
        self.engine.stop();
        info!(%id, minutes, "Alarm snoozed");
        let _ = self.events.send(SchedulerEvent::AlarmStopped { id });
        Ok(Some(id))
    }

    async fn fire(&self, alarm: &Alarm, snooze_wakeup: bool) -> AlarmOutcome {
        // Single mutation point for the active-alarm invariant: the check
        // and the claim happen under one lock.
        {
            let mut active = self.active.lock().unwrap();
            if let ActiveAlarm::Sounding { id } = *active {
                warn!(incumbent = %id, dropped = %alarm.id, "Firing dropped: another alarm is active");
                self.reporter.report(
                    REPORT_CONTEXT,
                    &format!("firing dropped for {}: alarm {id} is already active", alarm.id),
                );
                let _ = self.events.send(SchedulerEvent::FiringDropped { id: alarm.id });
                return AlarmOutcome::DroppedBusy;
            }
            *active = ActiveAlarm::Sounding { id: alarm.id };
        }

        let source = AudioSource::for_alarm(alarm);
        if let Err(e) = self.engine.start(&source).await {
            self.reporter.report(REPORT_CONTEXT, &e);
            self.take_active();
            return AlarmOutcome::PlaybackFailed;
        }

        if !snooze_wakeup && alarm.is_one_shot() {
            // Disable as part of the firing so the next tick cannot re-fire.
            if let Err(e) = self.store.set_enabled(alarm.id, false) {
                self.reporter.report(REPORT_CONTEXT, &e);
            }
        }

        if let Err(e) = self.notifier.notify_alarm_firing(alarm) {
            warn!(id = %alarm.id, error = e.as_str(), "Alarm notification failed");
        }

        info!(id = %alarm.id, snooze_wakeup, source = source.name(), "Alarm fired");
        let _ = self.events.send(SchedulerEvent::AlarmFired {
            id: alarm.id,
            snooze_wakeup,
        });
        AlarmOutcome::Fired { snooze_wakeup }
    }

    fn unwind_active(&self, reason: &str) {
        if let Some(id) = self.take_active() {
            debug!(%id, reason, "Active alarm unwound");
            let _ = self.events.send(SchedulerEvent::AlarmStopped { id });
        }
    }

    fn take_active(&self) -> Option<Uuid> {
        let mut active = self.active.lock().unwrap();
        match std::mem::replace(&mut *active, ActiveAlarm::Idle) {
            ActiveAlarm::Idle => None,
            ActiveAlarm::Sounding { id } => Some(id),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
