//! Radio-directory API entities.
//!
//! Field names follow the radio-browser JSON wire format so the structs
//! deserialize straight from the mirror responses.

use serde::{Deserialize, Serialize};

use crate::alarms::StationRef;

// ============================================================================
// Station
// ============================================================================

/// A radio station as returned by the directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Station {
    /// Stable directory id.
    #[serde(default)]
    pub stationuuid: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Registered stream URL.
    #[serde(default)]
    pub url: String,
    /// Playlist-resolved stream URL, when the directory has one.
    #[serde(default)]
    pub url_resolved: String,
    /// Favicon URL.
    #[serde(default)]
    pub favicon: String,
    /// Country display name.
    #[serde(default)]
    pub country: String,
    /// ISO 3166-1 alpha-2 code.
    #[serde(default)]
    pub countrycode: String,
    /// Comma-separated tag list.
    #[serde(default)]
    pub tags: String,
    /// Stream codec (MP3, AAC, ...).
    #[serde(default)]
    pub codec: String,
    /// Stream bitrate in kbit/s.
    #[serde(default)]
    pub bitrate: u32,
    /// Directory vote count.
    #[serde(default)]
    pub votes: i64,
}

impl Station {
    /// Returns the URL to actually play: the resolved URL when present,
    /// otherwise the registered one.
    #[must_use]
    pub fn playable_url(&self) -> &str {
        if self.url_resolved.trim().is_empty() {
            &self.url
        } else {
            &self.url_resolved
        }
    }
}

impl From<&Station> for StationRef {
    fn from(station: &Station) -> Self {
        Self {
            id: station.stationuuid.clone(),
            name: station.name.clone(),
            stream_url: station.playable_url().to_string(),
        }
    }
}

// ============================================================================
// Country / Tag
// ============================================================================

/// A country facet with its station count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub iso_3166_1: String,
    #[serde(default)]
    pub stationcount: u32,
}

/// A tag facet with its station count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub stationcount: u32,
}

// ============================================================================
// SearchParams
// ============================================================================

/// Parameters for a station search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams {
    /// Substring match on the station name.
    pub name: Option<String>,
    /// Country filter.
    pub country: Option<String>,
    /// Tag filter.
    pub tag: Option<String>,
    /// Maximum number of results.
    pub limit: Option<u32>,
}

impl SearchParams {
    /// Creates a name-only search.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Builds the HTTP query pairs for the search endpoint.
    ///
    /// Broken stations are always filtered out server-side.
    #[must_use]
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(name) = &self.name {
            query.push(("name".to_string(), name.clone()));
        }
        if let Some(country) = &self.country {
            query.push(("country".to_string(), country.clone()));
        }
        if let Some(tag) = &self.tag {
            query.push(("tag".to_string(), tag.clone()));
        }
        if let Some(limit) = self.limit {
            query.push(("limit".to_string(), limit.to_string()));
        }
        query.push(("hidebroken".to_string(), "true".to_string()));
        query
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playable_url_prefers_resolved() {
        let station = Station {
            url: "http://example.com/listen.pls".to_string(),
            url_resolved: "http://example.com/stream.mp3".to_string(),
            ..Station::default()
        };
        assert_eq!(station.playable_url(), "http://example.com/stream.mp3");
    }

    #[test]
    fn test_playable_url_falls_back_to_registered() {
        let station = Station {
            url: "http://example.com/stream.mp3".to_string(),
            url_resolved: String::new(),
            ..Station::default()
        };
        assert_eq!(station.playable_url(), "http://example.com/stream.mp3");
    }

    #[test]
    fn test_station_ref_conversion() {
        let station = Station {
            stationuuid: "uuid-1".to_string(),
            name: "Test Radio".to_string(),
            url: "http://example.com/a".to_string(),
            url_resolved: "http://example.com/b".to_string(),
            ..Station::default()
        };
        let station_ref = StationRef::from(&station);
        assert_eq!(station_ref.id, "uuid-1");
        assert_eq!(station_ref.name, "Test Radio");
        assert_eq!(station_ref.stream_url, "http://example.com/b");
    }

    #[test]
    fn test_station_deserializes_from_partial_json() {
        // Mirrors disagree about optional fields; missing ones must default.
        let station: Station =
            serde_json::from_str(r#"{"name":"Test Radio","url":"http://x"}"#).unwrap();
        assert_eq!(station.name, "Test Radio");
        assert_eq!(station.bitrate, 0);
        assert!(station.stationuuid.is_empty());
    }

    #[test]
    fn test_search_params_query_pairs() {
        let params = SearchParams {
            name: Some("jazz".to_string()),
            country: Some("Japan".to_string()),
            tag: None,
            limit: Some(20),
        };
        let query = params.to_query();
        assert!(query.contains(&("name".to_string(), "jazz".to_string())));
        assert!(query.contains(&("country".to_string(), "Japan".to_string())));
        assert!(query.contains(&("limit".to_string(), "20".to_string())));
        assert!(query.contains(&("hidebroken".to_string(), "true".to_string())));
        assert!(!query.iter().any(|(k, _)| k == "tag"));
    }

    #[test]
    fn test_named_search() {
        let params = SearchParams::named("fip");
        assert_eq!(params.name.as_deref(), Some("fip"));
        assert!(params.country.is_none());
    }
}
