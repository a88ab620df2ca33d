//! Playback engine implementations.
//!
//! The engine owns the single audio output of the process. Whoever holds it
//! at an instant (a firing alarm or a station preview) starts exactly one
//! source; starting a new source supersedes the previous one. Asynchronous
//! outcomes (stream finished, stream died right after starting) surface as
//! [`EngineEvent`]s so subscribers can unwind their own session state.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rodio::source::SineWave;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use stream_download::storage::temp::TempStorageProvider;
use stream_download::{Settings, StreamDownload};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::error::AudioError;
use super::source::AudioSource;

/// A stream that ends this soon after starting never produced real audio.
const STARTUP_FAILURE_WINDOW: Duration = Duration::from_secs(2);

/// Capacity of the engine event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Asynchronous playback outcomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A source was started and audio is queued on the output.
    Started,
    /// The current source ended on its own.
    Finished,
    /// The current source died before producing real audio.
    Failed(String),
}

/// Uniform play/stop contract over the audio output.
#[async_trait]
pub trait PlaybackEngine: Send + Sync {
    /// Starts the given source, superseding whatever was playing.
    ///
    /// Resolves once audio is queued on the output. Later outcomes arrive
    /// as [`EngineEvent`]s.
    async fn start(&self, source: &AudioSource) -> Result<(), AudioError>;

    /// Stops playback. Safe to call when nothing is loaded.
    fn stop(&self);

    /// Returns true while a source is loaded and not exhausted.
    fn is_playing(&self) -> bool;

    /// Subscribes to asynchronous playback outcomes.
    fn subscribe(&self) -> broadcast::Receiver<EngineEvent>;
}

/// Returns true for the known-benign error raced out by a concurrent stop;
/// it is logged at debug level and never escalated.
pub(crate) fn is_benign_teardown_error(error: &AudioError) -> bool {
    error.to_string().contains("seek interrupted")
}

// ============================================================================
// RodioEngine
// ============================================================================

/// Production engine backed by rodio.
pub struct RodioEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    handle: OutputStreamHandle,
    sink: Mutex<Option<Arc<Sink>>>,
    events: broadcast::Sender<EngineEvent>,
    // Bumped on every start/stop; stale watchers and racing decodes compare
    // against it before touching shared state.
    generation: AtomicU64,
}

impl RodioEngine {
    /// Creates the engine and opens the default audio output.
    ///
    /// # Errors
    ///
    /// Returns [`AudioError::DeviceUnavailable`] when no output device
    /// exists.
    pub fn new() -> Result<Self, AudioError> {
        let (stream, handle) =
            OutputStream::try_default().map_err(|e| AudioError::DeviceUnavailable(e.to_string()))?;
        // The output stream must stay alive for the whole process; dropping
        // it silences every sink created from its handle.
        std::mem::forget(stream);

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        debug!("Audio output stream initialized");

        Ok(Self {
            inner: Arc::new(EngineInner {
                handle,
                sink: Mutex::new(None),
                events,
                generation: AtomicU64::new(0),
            }),
        })
    }

    async fn open_stream_sink(&self, name: &str, url: &str) -> Result<Sink, AudioError> {
        debug!(station = name, url, "Opening stream");
        let parsed = url
            .parse::<reqwest::Url>()
            .map_err(|e| AudioError::StreamOpen(e.to_string()))?;
        let reader =
            StreamDownload::new_http(parsed, TempStorageProvider::new(), Settings::default())
                .await
                .map_err(|e| AudioError::StreamOpen(e.to_string()))?;

        let handle = self.inner.handle.clone();
        let join = tokio::task::spawn_blocking(move || -> Result<Sink, AudioError> {
            let decoder = Decoder::new(reader).map_err(|e| AudioError::Decode(e.to_string()))?;
            let sink =
                Sink::try_new(&handle).map_err(|e| AudioError::Playback(e.to_string()))?;
            sink.append(decoder);
            Ok(sink)
        });
        match join.await {
            Ok(result) => result,
            Err(e) => Err(AudioError::Playback(e.to_string())),
        }
    }

    fn open_fallback_sink(&self) -> Result<Sink, AudioError> {
        let sink =
            Sink::try_new(&self.inner.handle).map_err(|e| AudioError::Playback(e.to_string()))?;
        sink.append(alarm_tone());
        Ok(sink)
    }

    fn install_sink(&self, sink: Sink, generation: u64) {
        let sink = Arc::new(sink);
        *self.inner.sink.lock().unwrap() = Some(Arc::clone(&sink));

        let inner = Arc::clone(&self.inner);
        let started_at = Instant::now();
        tokio::task::spawn_blocking(move || {
            sink.sleep_until_end();
            if inner.generation.load(Ordering::SeqCst) != generation {
                // Superseded by a newer start or an explicit stop.
                return;
            }
            inner.sink.lock().unwrap().take();
            let event = if started_at.elapsed() < STARTUP_FAILURE_WINDOW {
                EngineEvent::Failed("stream ended during startup".to_string())
            } else {
                EngineEvent::Finished
            };
            let _ = inner.events.send(event);
        });
    }
}

#[async_trait]
impl PlaybackEngine for RodioEngine {
    async fn start(&self, source: &AudioSource) -> Result<(), AudioError> {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(previous) = self.inner.sink.lock().unwrap().take() {
            previous.stop();
        }

        let sink = match source {
            AudioSource::Stream { name, url } => match self.open_stream_sink(name, url).await {
                Ok(sink) => sink,
                Err(e) => {
                    if self.inner.generation.load(Ordering::SeqCst) != generation {
                        // A stop or swap won the race while the decoder was
                        // still probing; the session is already dead.
                        if is_benign_teardown_error(&e) {
                            debug!(error = %e, "Ignoring benign teardown race");
                        } else {
                            warn!(error = %e, "Error from superseded playback session");
                        }
                    }
                    return Err(e);
                }
            },
            AudioSource::Fallback { name } => {
                debug!(name = name.as_str(), "Starting fallback tone");
                self.open_fallback_sink()?
            }
        };

        self.install_sink(sink, generation);
        let _ = self.inner.events.send(EngineEvent::Started);
        Ok(())
    }

    fn stop(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        let sink = self.inner.sink.lock().unwrap().take();
        match sink {
            Some(sink) => {
                sink.stop();
                debug!("Playback stopped");
            }
            // Nothing loaded: stop is a no-op.
            None => debug!("Stop requested with no active playback"),
        }
    }

    fn is_playing(&self) -> bool {
        self.inner
            .sink
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|sink| !sink.empty())
    }

    fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.inner.events.subscribe()
    }
}

/// Repeating two-phase beep used when no station can be played.
fn alarm_tone() -> impl Source<Item = f32> + Send + 'static {
    SineWave::new(880.0)
        .take_duration(Duration::from_millis(350))
        .amplify(0.6)
        .delay(Duration::from_millis(250))
        .repeat_infinite()
}

// ============================================================================
// MockEngine
// ============================================================================

/// Scriptable engine for tests.
///
/// Records every started source, can fail a scripted number of starts, and
/// lets tests inject asynchronous outcomes.
pub struct MockEngine {
    started: Mutex<Vec<AudioSource>>,
    playing: std::sync::atomic::AtomicBool,
    stop_count: AtomicUsize,
    fail_remaining: AtomicUsize,
    events: broadcast::Sender<EngineEvent>,
}

impl Default for MockEngine {
    fn default() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            started: Mutex::new(Vec::new()),
            playing: std::sync::atomic::AtomicBool::new(false),
            stop_count: AtomicUsize::new(0),
            fail_remaining: AtomicUsize::new(0),
            events,
        }
    }
}

impl MockEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `n` calls to `start` fail.
    pub fn fail_next_starts(&self, n: usize) {
        self.fail_remaining.store(n, Ordering::SeqCst);
    }

    /// Returns every source passed to `start`, in order.
    #[must_use]
    pub fn started_sources(&self) -> Vec<AudioSource> {
        self.started.lock().unwrap().clone()
    }

    /// Returns the number of successful and failed `start` calls.
    #[must_use]
    pub fn start_count(&self) -> usize {
        self.started.lock().unwrap().len()
    }

    /// Returns the number of `stop` calls.
    #[must_use]
    pub fn stop_count(&self) -> usize {
        self.stop_count.load(Ordering::SeqCst)
    }

    /// Injects an asynchronous engine event.
    pub fn emit(&self, event: EngineEvent) {
        if matches!(event, EngineEvent::Finished | EngineEvent::Failed(_)) {
            self.playing.store(false, Ordering::SeqCst);
        }
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl PlaybackEngine for MockEngine {
    async fn start(&self, source: &AudioSource) -> Result<(), AudioError> {
        self.started.lock().unwrap().push(source.clone());
        if self
            .fail_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(AudioError::Playback("mock playback failure".to_string()));
        }
        self.playing.store(true, Ordering::SeqCst);
        let _ = self.events.send(EngineEvent::Started);
        Ok(())
    }

    fn stop(&self) {
        self.stop_count.fetch_add(1, Ordering::SeqCst);
        self.playing.store(false, Ordering::SeqCst);
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }
}

// ============================================================================
// Tests
// ============================================================================
