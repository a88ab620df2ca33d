//! Failover radio-directory client.
//!
//! The directory mirrors are independently operated and individually
//! unreliable; a flaky mirror must never surface as a visible failure while
//! healthy ones exist. Every logical request shuffles the full pool into a
//! fresh attempt queue and walks it with a fixed backoff until one endpoint
//! answers. Read operations never propagate a raw error to callers: when the
//! whole pool is down they report once and return an empty collection.

use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::report::ErrorReporter;

use super::error::DirectoryError;
use super::models::{Country, SearchParams, Station, Tag};
use super::transport::DirectoryTransport;

/// The public radio-browser mirror pool.
pub const DEFAULT_MIRRORS: &[&str] = &[
    "https://de1.api.radio-browser.info",
    "https://de2.api.radio-browser.info",
    "https://nl1.api.radio-browser.info",
    "https://fi1.api.radio-browser.info",
    "https://at1.api.radio-browser.info",
    "https://fr1.api.radio-browser.info",
    "https://us1.api.radio-browser.info",
    "https://uk1.api.radio-browser.info",
];

/// Fixed wait between two endpoint attempts.
pub const MIRROR_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Tags below this station count are noise and are dropped from listings.
const TAG_MIN_STATION_COUNT: u32 = 10;

/// Maximum number of tags returned by [`RadioDirectoryClient::list_tags`].
const TAG_LIST_CAP: usize = 100;

/// Radio-directory query client with mirror failover.
pub struct RadioDirectoryClient {
    transport: Arc<dyn DirectoryTransport>,
    reporter: Arc<dyn ErrorReporter>,
    mirrors: Vec<String>,
    retry_delay: Duration,
}

impl RadioDirectoryClient {
    /// Creates a client over the default mirror pool.
    #[must_use]
    pub fn new(transport: Arc<dyn DirectoryTransport>, reporter: Arc<dyn ErrorReporter>) -> Self {
        Self::with_mirrors(
            transport,
            reporter,
            DEFAULT_MIRRORS.iter().map(|m| (*m).to_string()).collect(),
        )
    }

    /// Creates a client over a custom mirror pool.
    #[must_use]
    pub fn with_mirrors(
        transport: Arc<dyn DirectoryTransport>,
        reporter: Arc<dyn ErrorReporter>,
        mirrors: Vec<String>,
    ) -> Self {
        Self {
            transport,
            reporter,
            mirrors,
            retry_delay: MIRROR_RETRY_DELAY,
        }
    }

    /// Overrides the inter-attempt delay (tests).
    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Searches stations. Returns an empty list when every mirror fails.
    pub async fn search(&self, params: &SearchParams) -> Vec<Station> {
        self.request("/json/stations/search", &params.to_query())
            .await
    }

    /// Lists countries, zero-count entries excluded, sorted descending by
    /// station count.
    pub async fn list_countries(&self) -> Vec<Country> {
        let mut countries: Vec<Country> = self.request("/json/countries", &[]).await;
        countries.retain(|c| c.stationcount > 0);
        countries.sort_by(|a, b| b.stationcount.cmp(&a.stationcount));
        countries
    }

    /// Lists tags with more than 10 stations, sorted descending by station
    /// count, capped to the top 100.
    pub async fn list_tags(&self) -> Vec<Tag> {
        let mut tags: Vec<Tag> = self.request("/json/tags", &[]).await;
        tags.retain(|t| t.stationcount > TAG_MIN_STATION_COUNT);
        tags.sort_by(|a, b| b.stationcount.cmp(&a.stationcount));
        tags.truncate(TAG_LIST_CAP);
        tags
    }

    /// Walks a freshly shuffled attempt queue until one endpoint yields a
    /// decodable body. All endpoints failing is reported once, aggregated.
    async fn request<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Vec<T> {
        let mut queue = self.mirrors.clone();
        queue.shuffle(&mut rand::rng());

        let mut failures: Vec<String> = Vec::new();

        for base in &queue {
            if !failures.is_empty() {
                tokio::time::sleep(self.retry_delay).await;
            }

            let url = format!("{base}{path}");
            match self.transport.get_json(&url, query).await {
                Ok(body) => match serde_json::from_str::<Vec<T>>(&body) {
                    Ok(items) => {
                        debug!(endpoint = base.as_str(), path, "Directory request ok");
                        return items;
                    }
                    Err(e) => {
                        warn!(endpoint = base.as_str(), "Undecodable directory response");
                        failures.push(format!("{base}: {}", DirectoryError::Decode(e.to_string())));
                    }
                },
                Err(e) => {
                    warn!(endpoint = base.as_str(), error = %e, "Directory endpoint failed");
                    failures.push(format!("{base}: {e}"));
                }
            }
        }

        self.reporter.report(
            "radio-directory",
            &DirectoryError::AllMirrorsFailed {
                attempts: queue.len(),
                detail: failures.join("; "),
            },
        );
        Vec::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
