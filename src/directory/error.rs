//! Radio-directory client error types.

use thiserror::Error;

/// Errors that can occur when talking to the radio-directory mirrors.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The endpoint answered with a non-2xx status.
    #[error("HTTPステータスエラー: {status}")]
    Http {
        /// HTTP status code
        status: u16,
    },

    /// The request could not be completed (DNS, connect, timeout, ...).
    #[error("ネットワークエラー: {0}")]
    Network(String),

    /// The endpoint answered but the body could not be decoded.
    #[error("レスポンスの解析に失敗しました: {0}")]
    Decode(String),

    /// Every mirror in the pool failed for one logical request.
    #[error("全てのミラーサーバーへの接続に失敗しました ({attempts}件試行): {detail}")]
    AllMirrorsFailed {
        /// Number of endpoints attempted
        attempts: usize,
        /// Per-endpoint failure summary
        detail: String,
    },
}

impl DirectoryError {
    /// Returns true if retrying against another mirror is meaningful.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Http { .. } | Self::Network(_) | Self::Decode(_)
        )
    }
}
