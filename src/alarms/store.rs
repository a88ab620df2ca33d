//! Durable alarm list storage.
//!
//! Pure CRUD over the key-value store: the whole list is read, modified and
//! written back on every mutation. Callers tolerate last-writer-wins.

use std::sync::Arc;

use chrono::{DateTime, Local};
use tracing::debug;
use uuid::Uuid;

use crate::storage::KeyValueStore;

use super::error::AlarmStoreError;
use super::Alarm;

/// Storage key holding the serialized alarm list.
pub const ALARMS_STORAGE_KEY: &str = "@rhythmee_alarms";

/// Persistent store for the alarm list.
pub struct AlarmStore {
    storage: Arc<dyn KeyValueStore>,
}

impl AlarmStore {
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// Loads the full alarm list. An absent key is an empty list.
    pub fn list(&self) -> Result<Vec<Alarm>, AlarmStoreError> {
        match self.storage.get(ALARMS_STORAGE_KEY)? {
            Some(raw) => {
                serde_json::from_str(&raw).map_err(|e| AlarmStoreError::Serialize(e.to_string()))
            }
            None => Ok(Vec::new()),
        }
    }

    /// Returns a single alarm by id.
    pub fn get(&self, id: Uuid) -> Result<Alarm, AlarmStoreError> {
        self.list()?
            .into_iter()
            .find(|a| a.id == id)
            .ok_or(AlarmStoreError::NotFound(id))
    }

    /// Appends a new alarm.
    pub fn add(&self, alarm: Alarm) -> Result<(), AlarmStoreError> {
        let mut alarms = self.list()?;
        debug!(id = %alarm.id, time = %alarm.time, "Adding alarm");
        alarms.push(alarm);
        self.write(&alarms)
    }

    /// Replaces the alarm with the same id.
    ///
    /// # Errors
    ///
    /// Returns [`AlarmStoreError::NotFound`] if no alarm with that id exists.
    pub fn update(&self, alarm: Alarm) -> Result<(), AlarmStoreError> {
        let mut alarms = self.list()?;
        let slot = alarms
            .iter_mut()
            .find(|a| a.id == alarm.id)
            .ok_or(AlarmStoreError::NotFound(alarm.id))?;
        *slot = alarm;
        self.write(&alarms)
    }

    /// Deletes an alarm.
    ///
    /// # Errors
    ///
    /// Returns [`AlarmStoreError::NotFound`] if no alarm with that id exists.
    pub fn remove(&self, id: Uuid) -> Result<(), AlarmStoreError> {
        let mut alarms = self.list()?;
        let before = alarms.len();
        alarms.retain(|a| a.id != id);
        if alarms.len() == before {
            return Err(AlarmStoreError::NotFound(id));
        }
        self.write(&alarms)
    }

    /// Enables or disables an alarm.
    pub fn set_enabled(&self, id: Uuid, enabled: bool) -> Result<(), AlarmStoreError> {
        self.mutate(id, |alarm| alarm.enabled = enabled)
    }

    /// Sets or replaces the pending snooze wakeup timestamp.
    pub fn set_snooze(
        &self,
        id: Uuid,
        snooze_until: Option<DateTime<Local>>,
    ) -> Result<(), AlarmStoreError> {
        self.mutate(id, |alarm| alarm.snooze_until = snooze_until)
    }

    /// Clears a pending snooze wakeup.
    pub fn clear_snooze(&self, id: Uuid) -> Result<(), AlarmStoreError> {
        self.set_snooze(id, None)
    }

    fn mutate(
        &self,
        id: Uuid,
        apply: impl FnOnce(&mut Alarm),
    ) -> Result<(), AlarmStoreError> {
        let mut alarms = self.list()?;
        let alarm = alarms
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(AlarmStoreError::NotFound(id))?;
        apply(alarm);
        self.write(&alarms)
    }

    fn write(&self, alarms: &[Alarm]) -> Result<(), AlarmStoreError> {
        let raw =
            serde_json::to_string(alarms).map_err(|e| AlarmStoreError::Serialize(e.to_string()))?;
        self.storage.set(ALARMS_STORAGE_KEY, &raw)?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarms::AlarmTime;
    use crate::storage::MemoryStorage;
    use chrono::TimeZone;

    fn store() -> AlarmStore {
        AlarmStore::new(Arc::new(MemoryStorage::new()))
    }

    fn alarm(hour: u8, minute: u8) -> Alarm {
        Alarm::new(AlarmTime::new(hour, minute).unwrap(), "test")
    }

    #[test]
    fn test_empty_store_lists_nothing() {
        assert!(store().list().unwrap().is_empty());
    }

    #[test]
    fn test_add_and_list() {
        let store = store();
        let a = alarm(7, 0);
        let b = alarm(8, 30);
        store.add(a.clone()).unwrap();
        store.add(b.clone()).unwrap();

        let alarms = store.list().unwrap();
        assert_eq!(alarms, vec![a, b]);
    }

    #[test]
    fn test_get() {
        let store = store();
        let a = alarm(7, 0);
        store.add(a.clone()).unwrap();

        assert_eq!(store.get(a.id).unwrap(), a);
        assert!(store.get(Uuid::new_v4()).unwrap_err().is_not_found());
    }

    #[test]
    fn test_update_existing() {
        let store = store();
        let mut a = alarm(7, 0);
        store.add(a.clone()).unwrap();

        a.label = "changed".to_string();
        store.update(a.clone()).unwrap();

        assert_eq!(store.get(a.id).unwrap().label, "changed");
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let store = store();
        let err = store.update(alarm(7, 0)).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_remove() {
        let store = store();
        let a = alarm(7, 0);
        store.add(a.clone()).unwrap();

        store.remove(a.id).unwrap();
        assert!(store.list().unwrap().is_empty());

        let err = store.remove(a.id).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_set_enabled() {
        let store = store();
        let a = alarm(7, 0);
        store.add(a.clone()).unwrap();

        store.set_enabled(a.id, false).unwrap();
        assert!(!store.get(a.id).unwrap().enabled);

        store.set_enabled(a.id, true).unwrap();
        assert!(store.get(a.id).unwrap().enabled);
    }

    #[test]
    fn test_set_and_clear_snooze() {
        let store = store();
        let a = alarm(7, 0);
        store.add(a.clone()).unwrap();

        let until = Local.with_ymd_and_hms(2024, 5, 1, 7, 39, 0).unwrap();
        store.set_snooze(a.id, Some(until)).unwrap();
        assert_eq!(store.get(a.id).unwrap().snooze_until, Some(until));

        store.clear_snooze(a.id).unwrap();
        assert!(store.get(a.id).unwrap().snooze_until.is_none());
    }

    #[test]
    fn test_storage_read_failure_propagates() {
        let storage = Arc::new(MemoryStorage::new());
        let store = AlarmStore::new(storage.clone());
        storage.set_fail_reads(true);

        assert!(matches!(
            store.list().unwrap_err(),
            AlarmStoreError::Storage(_)
        ));
    }

    #[test]
    fn test_corrupt_payload_is_serialize_error() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(ALARMS_STORAGE_KEY, "not an alarm list").unwrap();
        let store = AlarmStore::new(storage);

        assert!(matches!(
            store.list().unwrap_err(),
            AlarmStoreError::Serialize(_)
        ));
    }
}
