//! Audio engine error types.

use thiserror::Error;

/// Errors that can occur when starting or running playback.
#[derive(Debug, Error)]
pub enum AudioError {
    /// Audio output device is not available.
    #[error("オーディオデバイスが利用できません: {0}")]
    DeviceUnavailable(String),

    /// The remote stream could not be opened.
    #[error("ストリームを開けませんでした: {0}")]
    StreamOpen(String),

    /// The audio data could not be decoded.
    #[error("オーディオのデコードに失敗しました: {0}")]
    Decode(String),

    /// Generic playback failure.
    #[error("再生エラー: {0}")]
    Playback(String),
}

impl AudioError {
    /// Returns true if the failure is about the output device rather than
    /// the source.
    #[must_use]
    pub fn is_device_error(&self) -> bool {
        matches!(self, Self::DeviceUnavailable(_))
    }

    /// Returns true if the failure came from the network stream itself.
    #[must_use]
    pub fn is_stream_error(&self) -> bool {
        matches!(self, Self::StreamOpen(_) | Self::Decode(_))
    }
}
