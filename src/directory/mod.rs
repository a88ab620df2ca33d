//! Radio-directory access.
//!
//! This module covers everything between the app and the radio-browser
//! mirror pool:
//! - `client`: failover query client (shuffle pool, retry with backoff)
//! - `transport`: HTTP behind a trait, mockable for tests
//! - `models`: wire-format entities and search parameters
//! - `cache`: 24-hour cached country/tag listings
//! - `favorites`: persisted favorite stations

mod cache;
mod client;
mod error;
mod favorites;
mod models;
mod transport;

pub use cache::{CachedDirectory, CACHE_TTL_MS, COUNTRIES_CACHE_KEY, TAGS_CACHE_KEY};
pub use client::{RadioDirectoryClient, DEFAULT_MIRRORS, MIRROR_RETRY_DELAY};
pub use error::DirectoryError;
pub use favorites::{FavoriteStations, FAVORITES_STORAGE_KEY};
pub use models::{Country, SearchParams, Station, Tag};
pub use transport::{DirectoryTransport, MockTransport, ReqwestTransport, USER_AGENT};
