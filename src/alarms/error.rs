//! Alarm store error types.

use thiserror::Error;
use uuid::Uuid;

use crate::storage::StorageError;

/// Errors that can occur when reading or mutating the alarm list.
#[derive(Debug, Error)]
pub enum AlarmStoreError {
    /// No alarm with the given id exists.
    #[error("アラームが見つかりません: {0}")]
    NotFound(Uuid),

    /// The underlying key-value store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The persisted alarm list could not be encoded or decoded.
    #[error("アラームリストの変換に失敗しました: {0}")]
    Serialize(String),
}

impl AlarmStoreError {
    /// Returns true for the distinguishable "no such alarm" failure.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
