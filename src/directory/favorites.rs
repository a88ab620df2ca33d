//! Favorite stations.
//!
//! A small persisted list of directory stations, deduplicated by station id.

use std::sync::Arc;

use tracing::debug;

use crate::storage::{KeyValueStore, StorageError};

use super::models::Station;

/// Storage key for the favorite station list.
pub const FAVORITES_STORAGE_KEY: &str = "@rhythmee_favorites";

/// Persistent favorite-station list.
pub struct FavoriteStations {
    storage: Arc<dyn KeyValueStore>,
}

impl FavoriteStations {
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// Loads the favorite list. An absent key is an empty list.
    pub fn list(&self) -> Result<Vec<Station>, StorageError> {
        match self.storage.get(FAVORITES_STORAGE_KEY)? {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| StorageError::Corrupt(e.to_string())),
            None => Ok(Vec::new()),
        }
    }

    /// Returns true if a station with this id is a favorite.
    pub fn is_favorite(&self, station_id: &str) -> Result<bool, StorageError> {
        Ok(self.list()?.iter().any(|s| s.stationuuid == station_id))
    }

    /// Adds a station; a station already present is left untouched.
    pub fn add(&self, station: Station) -> Result<(), StorageError> {
        let mut stations = self.list()?;
        if stations.iter().any(|s| s.stationuuid == station.stationuuid) {
            return Ok(());
        }
        debug!(station = station.name.as_str(), "Adding favorite");
        stations.push(station);
        self.write(&stations)
    }

    /// Removes a station by id. Removing an absent station is a no-op.
    pub fn remove(&self, station_id: &str) -> Result<(), StorageError> {
        let mut stations = self.list()?;
        stations.retain(|s| s.stationuuid != station_id);
        self.write(&stations)
    }

    /// Toggles favorite status; returns the new status.
    pub fn toggle(&self, station: Station) -> Result<bool, StorageError> {
        if self.is_favorite(&station.stationuuid)? {
            self.remove(&station.stationuuid)?;
            Ok(false)
        } else {
            self.add(station)?;
            Ok(true)
        }
    }

    fn write(&self, stations: &[Station]) -> Result<(), StorageError> {
        let raw =
            serde_json::to_string(stations).map_err(|e| StorageError::Corrupt(e.to_string()))?;
        self.storage.set(FAVORITES_STORAGE_KEY, &raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn station(id: &str, name: &str) -> Station {
        Station {
            stationuuid: id.to_string(),
            name: name.to_string(),
            url: format!("http://example.com/{id}"),
            ..Station::default()
        }
    }

    fn favorites() -> FavoriteStations {
        FavoriteStations::new(Arc::new(MemoryStorage::new()))
    }

    #[test]
    fn test_empty_list() {
        assert!(favorites().list().unwrap().is_empty());
    }

    #[test]
    fn test_add_and_is_favorite() {
        let favorites = favorites();
        favorites.add(station("a", "FIP")).unwrap();

        assert!(favorites.is_favorite("a").unwrap());
        assert!(!favorites.is_favorite("b").unwrap());
    }

    #[test]
    fn test_add_deduplicates_by_id() {
        let favorites = favorites();
        favorites.add(station("a", "FIP")).unwrap();
        favorites.add(station("a", "FIP renamed")).unwrap();

        let list = favorites.list().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].name, "FIP");
    }

    #[test]
    fn test_remove() {
        let favorites = favorites();
        favorites.add(station("a", "FIP")).unwrap();
        favorites.remove("a").unwrap();
        assert!(!favorites.is_favorite("a").unwrap());

        // Removing again is fine.
        favorites.remove("a").unwrap();
    }

    #[test]
    fn test_toggle() {
        let favorites = favorites();
        assert!(favorites.toggle(station("a", "FIP")).unwrap());
        assert!(favorites.is_favorite("a").unwrap());
        assert!(!favorites.toggle(station("a", "FIP")).unwrap());
        assert!(!favorites.is_favorite("a").unwrap());
    }
}
