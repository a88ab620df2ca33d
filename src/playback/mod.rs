//! Preview playback coordination.
//!
//! The in-app "try this station" experience: one station previews at a time,
//! tapping the playing station toggles it off, and switching stations swaps
//! audio without ever flashing the displayed station to empty. The session
//! is an explicit tagged state with a single mutation point, guarded by a
//! per-swap session id so stale engine events and stale retries cannot
//! corrupt a newer session.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::audio::{AudioSource, EngineEvent, PlaybackEngine};
use crate::directory::Station;
use crate::report::ErrorReporter;
use crate::sleep_timer::PlaybackStopper;

/// Pause between stopping the old source and starting the new one, so the
/// audio engine is not asked to tear down and spin up in the same instant.
pub const SWAP_DEBOUNCE: Duration = Duration::from_millis(100);

/// Delay before the single retry after a failed start.
pub const RETRY_DELAY: Duration = Duration::from_millis(2000);

/// Context label used for reported preview failures.
const REPORT_CONTEXT: &str = "preview-playback";

/// Capacity of the preview event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

// ============================================================================
// State and events
// ============================================================================

/// Preview session state. The displayed station lives inside the variants,
/// so "loading with no station" is unrepresentable.
#[derive(Debug, Clone, PartialEq)]
pub enum PreviewPhase {
    /// No preview session.
    Idle,
    /// Stop-then-start swap in flight; the new station is already displayed.
    Transitioning {
        /// Swap target, displayed optimistically
        station: Station,
    },
    /// Waiting for the new source to produce audio.
    Loading {
        /// Station being loaded
        station: Station,
        /// True once the single retry has been spent
        retried: bool,
    },
    /// A station is audibly playing.
    Playing {
        /// The playing station
        station: Station,
    },
}

/// Preview state change, broadcast to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewEvent {
    /// Displayed station, if any.
    pub station: Option<Station>,
    /// True between "load requested" and "first audible frame".
    pub loading: bool,
    /// True while a station is audibly playing.
    pub playing: bool,
}

struct SessionState {
    phase: PreviewPhase,
    // Bumped whenever a new swap or an explicit stop supersedes the session.
    session_id: u64,
}

enum RequestAction {
    Drop,
    ToggleOff,
    Swap { session_id: u64 },
}

// ============================================================================
// PreviewCoordinator
// ============================================================================

/// Coordinates user-initiated station previews over the shared engine.
pub struct PreviewCoordinator {
    engine: Arc<dyn PlaybackEngine>,
    reporter: Arc<dyn ErrorReporter>,
    state: Mutex<SessionState>,
    events: broadcast::Sender<PreviewEvent>,
    swap_debounce: Duration,
    retry_delay: Duration,
}

impl PreviewCoordinator {
    #[must_use]
    pub fn new(engine: Arc<dyn PlaybackEngine>, reporter: Arc<dyn ErrorReporter>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            engine,
            reporter,
            state: Mutex::new(SessionState {
                phase: PreviewPhase::Idle,
                session_id: 0,
            }),
            events,
            swap_debounce: SWAP_DEBOUNCE,
            retry_delay: RETRY_DELAY,
        }
    }

    /// Overrides the swap debounce and retry delay (tests).
    #[must_use]
    pub fn with_delays(mut self, swap_debounce: Duration, retry_delay: Duration) -> Self {
        self.swap_debounce = swap_debounce;
        self.retry_delay = retry_delay;
        self
    }

    /// Subscribes to preview state changes.
    pub fn subscribe(&self) -> broadcast::Receiver<PreviewEvent> {
        self.events.subscribe()
    }

    /// Returns the current session phase.
    #[must_use]
    pub fn phase(&self) -> PreviewPhase {
        self.state.lock().unwrap().phase.clone()
    }

    /// Returns the displayed station, if any.
    #[must_use]
    pub fn current_station(&self) -> Option<Station> {
        match &self.state.lock().unwrap().phase {
            PreviewPhase::Idle => None,
            PreviewPhase::Transitioning { station }
            | PreviewPhase::Loading { station, .. }
            | PreviewPhase::Playing { station } => Some(station.clone()),
        }
    }

    /// Starts previewing `station`.
    ///
    /// Requesting the station that is already playing toggles it off. A
    /// request while a swap is in flight is dropped silently. Otherwise the
    /// old audio is stopped, the new station is displayed immediately, and
    /// the new source is started after a short debounce.
    pub async fn play_preview(&self, station: Station) {
        let action = {
            let mut state = self.state.lock().unwrap();
            match &state.phase {
                PreviewPhase::Transitioning { .. } | PreviewPhase::Loading { .. } => {
                    RequestAction::Drop
                }
                PreviewPhase::Playing { station: current }
                    if current.stationuuid == station.stationuuid =>
                {
                    RequestAction::ToggleOff
                }
                _ => {
                    state.session_id += 1;
                    state.phase = PreviewPhase::Transitioning {
                        station: station.clone(),
                    };
                    RequestAction::Swap {
                        session_id: state.session_id,
                    }
                }
            }
        };

        match action {
            RequestAction::Drop => {
                debug!(station = station.name.as_str(), "Swap in flight; request dropped");
            }
            RequestAction::ToggleOff => {
                info!(station = station.name.as_str(), "Preview toggled off");
                self.stop_preview();
            }
            RequestAction::Swap { session_id } => {
                self.emit_changed();
                // Stop the old audio without clearing the displayed station.
                self.engine.stop();
                tokio::time::sleep(self.swap_debounce).await;
                if !self.advance_to_loading(session_id) {
                    return;
                }
                self.emit_changed();
                self.start_with_retry(session_id, station).await;
            }
        }
    }

    /// Explicit full stop: audio off, no station displayed.
    pub fn stop_preview(&self) {
        let had_session = {
            let mut state = self.state.lock().unwrap();
            if matches!(state.phase, PreviewPhase::Idle) {
                false
            } else {
                state.session_id += 1;
                state.phase = PreviewPhase::Idle;
                true
            }
        };
        if had_session {
            self.engine.stop();
            debug!("Preview stopped");
            self.emit_changed();
        }
    }

    /// Handles asynchronous engine outcomes. Spawn as a tokio task.
    pub async fn run(self: Arc<Self>) {
        let mut events = self.engine.subscribe();
        loop {
            match events.recv().await {
                Ok(EngineEvent::Finished) => self.handle_finished(),
                Ok(EngineEvent::Failed(reason)) => self.handle_stream_failure(reason).await,
                Ok(EngineEvent::Started) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Preview coordinator lagged behind engine events");
                }
                Err(broadcast::error::RecvError::Closed) => return,
            }
        }
    }

    async fn start_with_retry(&self, session_id: u64, station: Station) {
        let source = AudioSource::stream(&station);

        match self.engine.start(&source).await {
            Ok(()) => {
                self.finish_start(session_id, station);
                return;
            }
            Err(e) => {
                warn!(station = station.name.as_str(), error = %e, "Preview start failed, retrying once");
                if !self.mark_retried(session_id) {
                    return;
                }
            }
        }

        tokio::time::sleep(self.retry_delay).await;
        if !self.is_current(session_id) {
            debug!("Preview target changed; abandoning retry");
            return;
        }
        match self.engine.start(&source).await {
            Ok(()) => self.finish_start(session_id, station),
            Err(e) => {
                self.reporter.report(REPORT_CONTEXT, &e);
                self.clear_session(session_id);
            }
        }
    }

    /// Retry once when an already playing stream dies underneath us.
    async fn handle_stream_failure(&self, reason: String) {
        let target = {
            let mut state = self.state.lock().unwrap();
            let station = match &state.phase {
                PreviewPhase::Playing { station } => Some(station.clone()),
                _ => None,
            };
            station.map(|station| {
                state.phase = PreviewPhase::Loading {
                    station: station.clone(),
                    retried: true,
                };
                (state.session_id, station)
            })
        };
        let Some((session_id, station)) = target else {
            return;
        };

        warn!(station = station.name.as_str(), reason = reason.as_str(), "Preview stream failed, retrying once");
        self.emit_changed();
        tokio::time::sleep(self.retry_delay).await;
        if !self.is_current(session_id) {
            return;
        }
        match self.engine.start(&AudioSource::stream(&station)).await {
            Ok(()) => self.finish_start(session_id, station),
            Err(e) => {
                self.reporter.report(REPORT_CONTEXT, &e);
                self.clear_session(session_id);
            }
        }
    }

    /// An ended stream is an implicit full stop.
    fn handle_finished(&self) {
        let was_playing = {
            let mut state = self.state.lock().unwrap();
            if matches!(state.phase, PreviewPhase::Playing { .. }) {
                state.session_id += 1;
                state.phase = PreviewPhase::Idle;
                true
            } else {
                false
            }
        };
        if was_playing {
            info!("Preview stream finished");
            self.emit_changed();
        }
    }

    fn advance_to_loading(&self, session_id: u64) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.session_id != session_id {
            return false;
        }
        let station = match &state.phase {
            PreviewPhase::Transitioning { station } => station.clone(),
            _ => return false,
        };
        state.phase = PreviewPhase::Loading {
            station,
            retried: false,
        };
        true
    }

    fn finish_start(&self, session_id: u64, station: Station) {
        let became_current = {
            let mut state = self.state.lock().unwrap();
            if state.session_id == session_id {
                state.phase = PreviewPhase::Playing { station };
                true
            } else {
                false
            }
        };
        if became_current {
            self.emit_changed();
        } else {
            // Superseded while the source was starting; silence it.
            self.engine.stop();
        }
    }

    /// Marks the single retry as spent; false when the session is stale.
    fn mark_retried(&self, session_id: u64) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.session_id != session_id {
            return false;
        }
        let station = match &state.phase {
            PreviewPhase::Loading {
                station,
                retried: false,
            } => station.clone(),
            _ => return false,
        };
        state.phase = PreviewPhase::Loading {
            station,
            retried: true,
        };
        true
    }

    fn clear_session(&self, session_id: u64) {
        let cleared = {
            let mut state = self.state.lock().unwrap();
            if state.session_id == session_id {
                state.phase = PreviewPhase::Idle;
                true
            } else {
                false
            }
        };
        if cleared {
            self.emit_changed();
        }
    }

    fn is_current(&self, session_id: u64) -> bool {
        self.state.lock().unwrap().session_id == session_id
    }

    fn emit_changed(&self) {
        let event = {
            let state = self.state.lock().unwrap();
            match &state.phase {
                PreviewPhase::Idle => PreviewEvent {
                    station: None,
                    loading: false,
                    playing: false,
                },
                PreviewPhase::Transitioning { station } => PreviewEvent {
                    station: Some(station.clone()),
                    loading: true,
                    playing: false,
                },
                PreviewPhase::Loading { station, .. } => PreviewEvent {
                    station: Some(station.clone()),
                    loading: true,
                    playing: false,
                },
                PreviewPhase::Playing { station } => PreviewEvent {
                    station: Some(station.clone()),
                    loading: false,
                    playing: true,
                },
            }
        };
        let _ = self.events.send(event);
    }
}

/// The sleep timer stops previews through this; it never touches the
/// scheduler's active-alarm state.
impl PlaybackStopper for PreviewCoordinator {
    fn request_stop(&self) {
        info!("Playback stop requested");
        self.stop_preview();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::MockEngine;
    use crate::report::MockErrorReporter;

    struct Fixture {
        engine: Arc<MockEngine>,
        reporter: Arc<MockErrorReporter>,
        coordinator: Arc<PreviewCoordinator>,
    }

    fn fixture() -> Fixture {
        let engine = Arc::new(MockEngine::new());
        let reporter = Arc::new(MockErrorReporter::new());
        let coordinator = Arc::new(
            PreviewCoordinator::new(engine.clone(), reporter.clone())
                .with_delays(Duration::from_millis(0), Duration::from_millis(0)),
        );
        Fixture {
            engine,
            reporter,
            coordinator,
        }
    }

    fn station(id: &str, name: &str) -> Station {
        Station {
            stationuuid: id.to_string(),
            name: name.to_string(),
            url: format!("http://example.com/{id}"),
            ..Station::default()
        }
    }

    #[tokio::test]
    async fn test_play_preview_reaches_playing() {
        let f = fixture();
        let a = station("a", "Alpha");

        f.coordinator.play_preview(a.clone()).await;

        assert_eq!(f.coordinator.phase(), PreviewPhase::Playing { station: a.clone() });
        assert_eq!(f.coordinator.current_station(), Some(a));
        assert_eq!(f.engine.start_count(), 1);
    }

    #[tokio::test]
    async fn test_same_station_toggles_off() {
        let f = fixture();
        let a = station("a", "Alpha");

        f.coordinator.play_preview(a.clone()).await;
        f.coordinator.play_preview(a).await;

        // Toggled off: stopped, nothing displayed, not restarted.
        assert_eq!(f.coordinator.phase(), PreviewPhase::Idle);
        assert!(f.coordinator.current_station().is_none());
        assert_eq!(f.engine.start_count(), 1);
    }

    #[tokio::test]
    async fn test_switching_station_swaps_cleanly() {
        let f = fixture();
        let a = station("a", "Alpha");
        let b = station("b", "Beta");

        f.coordinator.play_preview(a).await;
        f.coordinator.play_preview(b.clone()).await;

        assert_eq!(f.coordinator.current_station(), Some(b));
        assert_eq!(f.engine.start_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_during_swap_is_dropped() {
        let engine = Arc::new(MockEngine::new());
        let reporter = Arc::new(MockErrorReporter::new());
        let coordinator = Arc::new(
            PreviewCoordinator::new(engine.clone(), reporter)
                .with_delays(Duration::from_millis(100), Duration::from_millis(0)),
        );
        let a = station("a", "Alpha");
        let b = station("b", "Beta");

        let first = {
            let coordinator = coordinator.clone();
            let a = a.clone();
            tokio::spawn(async move { coordinator.play_preview(a).await })
        };
        // Let the first swap enter its debounce.
        tokio::time::sleep(Duration::from_millis(10)).await;

        coordinator.play_preview(b).await;
        first.await.unwrap();

        // The overlapping request was dropped; A's swap completed.
        assert_eq!(coordinator.current_station().map(|s| s.stationuuid), Some("a".to_string()));
        assert_eq!(engine.start_count(), 1);
    }

    #[tokio::test]
    async fn test_displayed_station_never_flashes_empty_during_swap() {
        let f = fixture();
        let a = station("a", "Alpha");
        let b = station("b", "Beta");
        let mut rx = f.coordinator.subscribe();

        f.coordinator.play_preview(a).await;
        f.coordinator.play_preview(b).await;

        let mut saw_none_while_swapping = false;
        while let Ok(event) = rx.try_recv() {
            if event.station.is_none() {
                saw_none_while_swapping = true;
            }
        }
        assert!(!saw_none_while_swapping);
    }

    #[tokio::test]
    async fn test_first_failure_retries_and_succeeds() {
        let f = fixture();
        f.engine.fail_next_starts(1);
        let a = station("a", "Alpha");

        f.coordinator.play_preview(a.clone()).await;

        assert_eq!(f.coordinator.phase(), PreviewPhase::Playing { station: a });
        assert_eq!(f.engine.start_count(), 2);
        // Recovered: nothing reported.
        assert_eq!(f.reporter.report_count(), 0);
    }

    #[tokio::test]
    async fn test_second_failure_clears_all_state_and_reports() {
        let f = fixture();
        f.engine.fail_next_starts(2);
        let a = station("a", "Alpha");

        f.coordinator.play_preview(a).await;

        assert_eq!(f.coordinator.phase(), PreviewPhase::Idle);
        assert!(f.coordinator.current_station().is_none());
        assert_eq!(f.engine.start_count(), 2);
        assert_eq!(f.reporter.report_count(), 1);
    }

    #[tokio::test]
    async fn test_stop_preview_is_idempotent() {
        let f = fixture();
        let a = station("a", "Alpha");
        f.coordinator.play_preview(a).await;

        f.coordinator.stop_preview();
        let stops_after_first = f.engine.stop_count();
        f.coordinator.stop_preview();

        assert_eq!(f.coordinator.phase(), PreviewPhase::Idle);
        // The second stop found no session and did not touch the engine.
        assert_eq!(f.engine.stop_count(), stops_after_first);
    }

    #[tokio::test]
    async fn test_finished_event_is_implicit_full_stop() {
        let f = fixture();
        let a = station("a", "Alpha");
        f.coordinator.play_preview(a).await;

        let runner = tokio::spawn(f.coordinator.clone().run());
        f.engine.emit(EngineEvent::Finished);
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        runner.abort();

        assert_eq!(f.coordinator.phase(), PreviewPhase::Idle);
        assert!(f.coordinator.current_station().is_none());
    }

    #[tokio::test]
    async fn test_playback_stopper_stops_preview() {
        let f = fixture();
        let a = station("a", "Alpha");
        f.coordinator.play_preview(a).await;

        let stopper: Arc<dyn PlaybackStopper> = f.coordinator.clone();
        stopper.request_stop();

        assert_eq!(f.coordinator.phase(), PreviewPhase::Idle);
    }
}
