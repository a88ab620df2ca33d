//! Sleep timer.
//!
//! An independent countdown that stops playback when it expires: "play this
//! station for 30 more minutes, then silence". Exactly one timer can run;
//! starting a new one fully cancels the prior one. The remaining time is
//! recomputed from the wall clock on every tick — never decremented — so it
//! stays correct across process suspension and resume.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::clock::Clock;

/// Capacity of the timer event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Receives the "stop current playback" request on timer expiry.
pub trait PlaybackStopper: Send + Sync {
    /// Requests that current playback stop.
    fn request_stop(&self);
}

/// Mock stopper for tests.
#[derive(Debug, Default)]
pub struct MockStopper {
    stops: AtomicUsize,
}

impl MockStopper {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many stop requests were received.
    #[must_use]
    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl PlaybackStopper for MockStopper {
    fn request_stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Events
// ============================================================================

/// Sleep timer events, broadcast to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SleepTimerEvent {
    /// Emitted on start, stop, and completion.
    StateChanged {
        /// True while a timer is armed
        active: bool,
        /// Remaining milliseconds, clamped to zero
        remaining_ms: u64,
        /// Zero-padded `HH:MM:SS`
        formatted: String,
    },
    /// Emitted every second while the timer is active.
    Tick {
        /// Remaining milliseconds, clamped to zero
        remaining_ms: u64,
        /// Zero-padded `HH:MM:SS`
        formatted: String,
    },
    /// Emitted exactly once when the countdown reaches zero.
    Completed,
}

/// Formats remaining milliseconds as zero-padded `HH:MM:SS`.
#[must_use]
pub fn format_remaining(remaining_ms: u64) -> String {
    let total_secs = remaining_ms / 1000;
    format!(
        "{:02}:{:02}:{:02}",
        total_secs / 3600,
        (total_secs % 3600) / 60,
        total_secs % 60
    )
}

// ============================================================================
// SleepTimer
// ============================================================================

#[derive(Debug, Default)]
struct TimerSlot {
    end_time: Option<DateTime<Local>>,
    task: Option<JoinHandle<()>>,
}

/// The sleep timer service.
pub struct SleepTimer {
    clock: Arc<dyn Clock>,
    stopper: Arc<dyn PlaybackStopper>,
    slot: Mutex<TimerSlot>,
    events: broadcast::Sender<SleepTimerEvent>,
}

impl SleepTimer {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, stopper: Arc<dyn PlaybackStopper>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            clock,
            stopper,
            slot: Mutex::new(TimerSlot::default()),
            events,
        }
    }

    /// Subscribes to timer events.
    pub fn subscribe(&self) -> broadcast::Receiver<SleepTimerEvent> {
        self.events.subscribe()
    }

    /// Arms the timer for `minutes`. Zero minutes is a logged no-op.
    ///
    /// Starting is the cancellation point for any prior instance: an already
    /// running timer is fully canceled first, so exactly one timer exists.
    pub fn start(self: &Arc<Self>, minutes: u32) {
        if minutes == 0 {
            warn!("Ignoring sleep timer start with zero duration");
            return;
        }

        let end_time = self.clock.now() + chrono::Duration::minutes(i64::from(minutes));
        {
            let mut slot = self.slot.lock().unwrap();
            if let Some(task) = slot.task.take() {
                debug!("Canceling previous sleep timer");
                task.abort();
            }
            slot.end_time = Some(end_time);
        }

        let remaining_ms = u64::from(minutes) * 60_000;
        info!(minutes, "Sleep timer started");
        let _ = self.events.send(SleepTimerEvent::StateChanged {
            active: true,
            remaining_ms,
            formatted: format_remaining(remaining_ms),
        });

        let timer = Arc::clone(self);
        let task = tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(1));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first interval tick resolves immediately; consume it so
            // ticks land one second apart from the start.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if timer.tick_once() {
                    break;
                }
            }
        });
        self.slot.lock().unwrap().task = Some(task);
    }

    /// Cancels the timer. Stopping an inactive timer is a no-op.
    pub fn stop(&self) {
        let was_active = {
            let mut slot = self.slot.lock().unwrap();
            if let Some(task) = slot.task.take() {
                task.abort();
            }
            slot.end_time.take().is_some()
        };

        if was_active {
            info!("Sleep timer stopped");
            let _ = self.events.send(SleepTimerEvent::StateChanged {
                active: false,
                remaining_ms: 0,
                formatted: format_remaining(0),
            });
        } else {
            debug!("Stop requested with no active sleep timer");
        }
    }

    /// Returns true while a timer is armed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.slot.lock().unwrap().end_time.is_some()
    }

    /// Remaining time, clamped to zero. Zero when inactive.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        Duration::from_millis(self.remaining_ms().unwrap_or(0))
    }

    /// Advances the countdown by one evaluation.
    ///
    /// The run loop calls this every second; a host that drives its own
    /// cadence (or a test) may call it directly. Returns true once the timer
    /// is no longer active.
    pub fn tick_once(&self) -> bool {
        let Some(remaining_ms) = self.remaining_ms() else {
            return true;
        };

        let _ = self.events.send(SleepTimerEvent::Tick {
            remaining_ms,
            formatted: format_remaining(remaining_ms),
        });

        if remaining_ms > 0 {
            return false;
        }

        // Exactly-once completion: only the caller that clears the end time
        // gets to emit and request the playback stop.
        let completed = {
            let mut slot = self.slot.lock().unwrap();
            slot.task.take();
            slot.end_time.take().is_some()
        };
        if completed {
            info!("Sleep timer completed");
            let _ = self.events.send(SleepTimerEvent::StateChanged {
                active: false,
                remaining_ms: 0,
                formatted: format_remaining(0),
            });
            let _ = self.events.send(SleepTimerEvent::Completed);
            self.stopper.request_stop();
        }
        true
    }

    fn remaining_ms(&self) -> Option<u64> {
        let end_time = self.slot.lock().unwrap().end_time?;
        let remaining = end_time
            .signed_duration_since(self.clock.now())
            .num_milliseconds()
            .max(0);
        Some(remaining as u64)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::TimeZone;

    struct Fixture {
        clock: Arc<FixedClock>,
        stopper: Arc<MockStopper>,
        timer: Arc<SleepTimer>,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(FixedClock::new(
            Local.with_ymd_and_hms(2024, 5, 1, 22, 0, 0).unwrap(),
        ));
        let stopper = Arc::new(MockStopper::new());
        let timer = Arc::new(SleepTimer::new(clock.clone(), stopper.clone()));
        Fixture {
            clock,
            stopper,
            timer,
        }
    }

    fn drain(rx: &mut broadcast::Receiver<SleepTimerEvent>) -> Vec<SleepTimerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    mod format_tests {
        use super::*;

        #[test]
        fn test_format_remaining() {
            assert_eq!(format_remaining(0), "00:00:00");
            assert_eq!(format_remaining(1_000), "00:00:01");
            assert_eq!(format_remaining(90_000), "00:01:30");
            assert_eq!(format_remaining(5 * 60_000), "00:05:00");
            assert_eq!(format_remaining(3_661_000), "01:01:01");
        }

        #[test]
        fn test_format_floors_partial_seconds() {
            assert_eq!(format_remaining(1_999), "00:00:01");
        }
    }

    mod timer_tests {
        use super::*;

        #[tokio::test]
        async fn test_zero_minutes_is_a_no_op() {
            let f = fixture();
            let mut rx = f.timer.subscribe();

            f.timer.start(0);

            assert!(!f.timer.is_active());
            assert!(drain(&mut rx).is_empty());
        }

        #[tokio::test]
        async fn test_start_arms_and_emits_state_changed() {
            let f = fixture();
            let mut rx = f.timer.subscribe();

            f.timer.start(5);

            assert!(f.timer.is_active());
            assert_eq!(f.timer.remaining(), Duration::from_secs(300));
            assert_eq!(
                rx.try_recv().unwrap(),
                SleepTimerEvent::StateChanged {
                    active: true,
                    remaining_ms: 300_000,
                    formatted: "00:05:00".to_string(),
                }
            );
        }

        #[tokio::test]
        async fn test_restart_replaces_previous_timer() {
            let f = fixture();

            f.timer.start(10);
            f.timer.start(5);

            // Exactly one timer, expiring five minutes out.
            assert!(f.timer.is_active());
            assert_eq!(f.timer.remaining(), Duration::from_secs(300));

            // The first timer was fully canceled: advancing past five
            // minutes completes once, not twice.
            f.clock.advance(chrono::Duration::minutes(5));
            assert!(f.timer.tick_once());
            assert_eq!(f.stopper.stop_count(), 1);
        }

        #[tokio::test]
        async fn test_remaining_is_wall_clock_derived() {
            let f = fixture();
            f.timer.start(5);

            // A suspended process resumes 4 minutes later: remaining reflects
            // the wall clock, not missed decrements.
            f.clock.advance(chrono::Duration::minutes(4));
            assert_eq!(f.timer.remaining(), Duration::from_secs(60));
        }

        #[tokio::test]
        async fn test_remaining_is_monotonically_non_increasing() {
            let f = fixture();
            f.timer.start(2);

            let mut last = f.timer.remaining();
            for _ in 0..10 {
                f.clock.advance(chrono::Duration::seconds(15));
                f.timer.tick_once();
                let now = f.timer.remaining();
                assert!(now <= last);
                last = now;
            }
        }

        #[tokio::test]
        async fn test_completion_sequence() {
            let f = fixture();
            let mut rx = f.timer.subscribe();
            f.timer.start(1);
            drain(&mut rx);

            f.clock.advance(chrono::Duration::minutes(1));
            assert!(f.timer.tick_once());

            let events = drain(&mut rx);
            assert_eq!(
                events,
                vec![
                    SleepTimerEvent::Tick {
                        remaining_ms: 0,
                        formatted: "00:00:00".to_string(),
                    },
                    SleepTimerEvent::StateChanged {
                        active: false,
                        remaining_ms: 0,
                        formatted: "00:00:00".to_string(),
                    },
                    SleepTimerEvent::Completed,
                ]
            );
            assert!(!f.timer.is_active());
            assert_eq!(f.stopper.stop_count(), 1);
        }

        #[tokio::test]
        async fn test_completion_is_exactly_once() {
            let f = fixture();
            let mut rx = f.timer.subscribe();
            f.timer.start(1);
            drain(&mut rx);

            f.clock.advance(chrono::Duration::minutes(2));
            assert!(f.timer.tick_once());
            assert!(f.timer.tick_once());
            assert!(f.timer.tick_once());

            let completions = drain(&mut rx)
                .into_iter()
                .filter(|e| matches!(e, SleepTimerEvent::Completed))
                .count();
            assert_eq!(completions, 1);
            assert_eq!(f.stopper.stop_count(), 1);
        }

        #[tokio::test]
        async fn test_stop_cancels_and_emits() {
            let f = fixture();
            let mut rx = f.timer.subscribe();
            f.timer.start(5);
            drain(&mut rx);

            f.timer.stop();

            assert!(!f.timer.is_active());
            assert_eq!(f.timer.remaining(), Duration::ZERO);
            assert_eq!(
                rx.try_recv().unwrap(),
                SleepTimerEvent::StateChanged {
                    active: false,
                    remaining_ms: 0,
                    formatted: "00:00:00".to_string(),
                }
            );
            // Canceled, not completed: no stop request to playback.
            assert_eq!(f.stopper.stop_count(), 0);
        }

        #[tokio::test]
        async fn test_stop_when_inactive_is_silent() {
            let f = fixture();
            let mut rx = f.timer.subscribe();

            f.timer.stop();

            assert!(drain(&mut rx).is_empty());
        }

        #[tokio::test]
        async fn test_ticks_emitted_while_active() {
            let f = fixture();
            let mut rx = f.timer.subscribe();
            f.timer.start(1);
            drain(&mut rx);

            f.clock.advance(chrono::Duration::seconds(30));
            assert!(!f.timer.tick_once());

            assert_eq!(
                rx.try_recv().unwrap(),
                SleepTimerEvent::Tick {
                    remaining_ms: 30_000,
                    formatted: "00:00:30".to_string(),
                }
            );
        }
    }
}
