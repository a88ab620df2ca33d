//! rhythmee - internet-radio alarm clock engine
//!
//! This library provides the core of an internet-radio alarm clock:
//! - Alarm data model and durable alarm store
//! - Polling alarm scheduler with snooze handling and single-active-alarm
//!   enforcement
//! - Audio source abstraction (radio stream / bundled fallback tone) over a
//!   single playback engine
//! - Sleep timer that stops playback when it expires
//! - Preview coordinator for auditioning stations
//! - Failover radio-directory client with cached listings and favorites
//! - CLI commands and display utilities

pub mod alarms;
pub mod audio;
pub mod cli;
pub mod clock;
pub mod daemon;
pub mod directory;
pub mod playback;
pub mod report;
pub mod scheduler;
pub mod sleep_timer;
pub mod storage;

// Re-export commonly used types for convenience
pub use alarms::{Alarm, AlarmStore, AlarmStoreError, AlarmTime, StationRef, ALARMS_STORAGE_KEY};
pub use audio::{AudioError, AudioSource, EngineEvent, MockEngine, PlaybackEngine, RodioEngine};
pub use clock::{Clock, FixedClock, SystemClock};
pub use daemon::{App, AppConfig};
pub use directory::{
    CachedDirectory, Country, DirectoryError, DirectoryTransport, FavoriteStations, MockTransport,
    RadioDirectoryClient, ReqwestTransport, SearchParams, Station, Tag, DEFAULT_MIRRORS,
};
pub use playback::{PreviewCoordinator, PreviewEvent, PreviewPhase};
pub use report::{ErrorReporter, LogReporter, MockErrorReporter};
pub use scheduler::{
    evaluate, AlarmNotifier, AlarmOutcome, AlarmScheduler, FireDecision, LogNotifier, MockNotifier,
    SchedulerEvent,
};
pub use sleep_timer::{
    format_remaining, MockStopper, PlaybackStopper, SleepTimer, SleepTimerEvent,
};
pub use storage::{JsonFileStorage, KeyValueStore, MemoryStorage, StorageError};
