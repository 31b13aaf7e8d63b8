//! Audio error types (thiserror-based).

use thiserror::Error;

/// Playback error type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AudioError {
    /// A newer play request replaced this one before it started. Expected
    /// during fast slide changes and never shown to the user.
    #[error("Playback request superseded by a newer one")]
    Superseded,

    /// The audio reference could not be loaded.
    #[error("Failed to load audio source: {0}")]
    Source(String),

    /// The output device refused to start.
    #[error("Audio output error: {0}")]
    Device(String),

    #[error("Unsupported audio format: {0}")]
    Unsupported(String),
}

impl AudioError {
    pub fn is_superseded(&self) -> bool {
        matches!(self, AudioError::Superseded)
    }
}

pub type AudioResult<T> = Result<T, AudioError>;
