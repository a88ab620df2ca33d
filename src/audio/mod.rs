//! Audio playback system.
//!
//! This module provides the playable-source abstraction and the engine that
//! owns the process's single audio output:
//!
//! ```text
//! ┌──────────────────┐
//! │  PlaybackEngine  │ ← uniform start/stop/is_playing + events
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐     ┌──────────────────┐
//! │   AudioSource    │────▶│  Radio stream    │
//! │                  │     │  (HTTP + rodio)  │
//! │                  │     ├──────────────────┤
//! │                  │────▶│  Fallback tone   │
//! └──────────────────┘     │  (generated)     │
//!                          └──────────────────┘
//! ```
//!
//! The factory in [`AudioSource`] guarantees a firing alarm always has
//! something audible: an unusable station reference degrades to the bundled
//! tone instead of failing silently.

mod engine;
mod error;
mod source;

pub use engine::{EngineEvent, MockEngine, PlaybackEngine, RodioEngine};
pub use error::AudioError;
pub use source::AudioSource;
