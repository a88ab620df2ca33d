//! Cached country and tag listings.
//!
//! Country/tag facets change slowly; re-fetching them on every screen visit
//! hammers the mirrors for nothing. Listings are kept in the key-value store
//! with the fetch timestamp and reused within a 24-hour freshness window.
//! A fetch that comes back empty (pool exhausted) never overwrites a usable
//! stale cache.

use std::sync::Arc;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::storage::KeyValueStore;

use super::client::RadioDirectoryClient;
use super::models::{Country, SearchParams, Station, Tag};

/// Storage key for the cached country list.
pub const COUNTRIES_CACHE_KEY: &str = "@rhythmee_countries";

/// Storage key for the cached tag list.
pub const TAGS_CACHE_KEY: &str = "@rhythmee_tags";

/// Freshness window for cached listings.
pub const CACHE_TTL_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Serialize, Deserialize)]
struct CacheEnvelope<T> {
    fetched_at_ms: i64,
    entries: Vec<T>,
}

/// Directory facade that caches slow-moving listings.
pub struct CachedDirectory {
    client: RadioDirectoryClient,
    storage: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl CachedDirectory {
    #[must_use]
    pub fn new(
        client: RadioDirectoryClient,
        storage: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            client,
            storage,
            clock,
        }
    }

    /// Station search is always live; results are too volatile to cache.
    pub async fn search(&self, params: &SearchParams) -> Vec<Station> {
        self.client.search(params).await
    }

    /// Country list, served from cache within the freshness window.
    pub async fn countries(&self) -> Vec<Country> {
        if let Some(cached) = self.load_fresh::<Country>(COUNTRIES_CACHE_KEY) {
            return cached;
        }
        let fetched = self.client.list_countries().await;
        self.store_or_keep_stale(COUNTRIES_CACHE_KEY, fetched)
    }

    /// Tag list, served from cache within the freshness window.
    pub async fn tags(&self) -> Vec<Tag> {
        if let Some(cached) = self.load_fresh::<Tag>(TAGS_CACHE_KEY) {
            return cached;
        }
        let fetched = self.client.list_tags().await;
        self.store_or_keep_stale(TAGS_CACHE_KEY, fetched)
    }

    /// Returns the cached entries when present and within the TTL.
    fn load_fresh<T: DeserializeOwned>(&self, key: &str) -> Option<Vec<T>> {
        let envelope = self.load_envelope::<T>(key)?;
        let age_ms = self.clock.now().timestamp_millis() - envelope.fetched_at_ms;
        if (0..CACHE_TTL_MS).contains(&age_ms) {
            debug!(key, age_ms, "Directory cache hit");
            Some(envelope.entries)
        } else {
            debug!(key, age_ms, "Directory cache stale");
            None
        }
    }

    fn load_envelope<T: DeserializeOwned>(&self, key: &str) -> Option<CacheEnvelope<T>> {
        let raw = self.storage.get(key).ok().flatten()?;
        match serde_json::from_str(&raw) {
            Ok(envelope) => Some(envelope),
            Err(e) => {
                warn!(key, error = %e, "Discarding unreadable directory cache");
                None
            }
        }
    }

    /// Persists a non-empty fetch; for an empty one, falls back to whatever
    /// stale entries are still stored.
    fn store_or_keep_stale<T: Serialize + DeserializeOwned>(
        &self,
        key: &str,
        fetched: Vec<T>,
    ) -> Vec<T> {
        if fetched.is_empty() {
            if let Some(stale) = self.load_envelope::<T>(key) {
                if !stale.entries.is_empty() {
                    warn!(key, "Directory fetch empty, serving stale cache");
                    return stale.entries;
                }
            }
            return fetched;
        }

        let envelope = CacheEnvelope {
            fetched_at_ms: self.clock.now().timestamp_millis(),
            entries: fetched,
        };
        match serde_json::to_string(&envelope) {
            Ok(raw) => {
                if let Err(e) = self.storage.set(key, &raw) {
                    warn!(key, error = %e, "Failed to write directory cache");
                }
            }
            Err(e) => warn!(key, error = %e, "Failed to encode directory cache"),
        }
        envelope.entries
    }
}

// ============================================================================
// Tests
// ============================================================================
