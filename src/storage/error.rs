//! Storage error types.

use thiserror::Error;

/// Errors that can occur in the key-value storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying file I/O failed.
    #[error("ストレージの読み書きに失敗しました: {0}")]
    Io(String),

    /// The storage file exists but could not be parsed.
    #[error("ストレージファイルが破損しています: {0}")]
    Corrupt(String),
}

impl StorageError {
    /// Returns true if the stored data itself is unusable (as opposed to a
    /// transient I/O failure).
    #[must_use]
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::Corrupt(_))
    }
}
