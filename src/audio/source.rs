//! Playable-source descriptors.
//!
//! An [`AudioSource`] is the unit the playback engine knows how to start:
//! either a network radio stream or the bundled fallback alarm tone. The
//! factory functions pick the right variant for an alarm, so a missing or
//! unusable station reference always degrades to something audible.

use crate::alarms::{Alarm, StationRef};
use crate::directory::Station;

/// Name used for the bundled fallback tone.
const FALLBACK_NAME: &str = "default-alarm";

/// A playable unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSource {
    /// A network radio stream.
    Stream {
        /// Station display name.
        name: String,
        /// Stream URL.
        url: String,
    },
    /// The bundled alarm tone, generated locally.
    Fallback {
        /// Display name.
        name: String,
    },
}

impl AudioSource {
    /// Creates a stream source for a directory station.
    #[must_use]
    pub fn stream(station: &Station) -> Self {
        Self::Stream {
            name: station.name.clone(),
            url: station.playable_url().to_string(),
        }
    }

    /// Creates the bundled fallback tone source.
    #[must_use]
    pub fn fallback() -> Self {
        Self::Fallback {
            name: FALLBACK_NAME.to_string(),
        }
    }

    /// Creates a source from a stored station reference, degrading to the
    /// fallback tone when the reference is not playable.
    #[must_use]
    pub fn from_ref(station: &StationRef) -> Self {
        if station.is_playable() {
            Self::Stream {
                name: station.name.clone(),
                url: station.stream_url.clone(),
            }
        } else {
            Self::fallback()
        }
    }

    /// Selects the source for a firing alarm: the referenced station when it
    /// is playable, otherwise the bundled fallback tone.
    #[must_use]
    pub fn for_alarm(alarm: &Alarm) -> Self {
        match &alarm.station {
            Some(station) => Self::from_ref(station),
            None => Self::fallback(),
        }
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Stream { name, .. } | Self::Fallback { name } => name,
        }
    }

    /// Returns the stream URL for network sources.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Stream { url, .. } => Some(url),
            Self::Fallback { .. } => None,
        }
    }

    /// Returns true for network stream sources.
    #[must_use]
    pub fn is_stream(&self) -> bool {
        matches!(self, Self::Stream { .. })
    }

    /// Returns true for the bundled fallback tone.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}
