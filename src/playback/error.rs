//! Playback errors

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaybackError {
    #[error("No recordings available to play")]
    EmptyInput,

    #[error("Clip '{clip}' did not become ready: {reason}")]
    Readiness { clip: String, reason: String },

    #[error("Clip '{clip}' failed to start: {reason}")]
    PlaybackStart { clip: String, reason: String },

    #[error("Drift correction failed for '{clip}': {reason}")]
    Correction { clip: String, reason: String },

    #[error("Playback monitor fault: {0}")]
    MonitorFault(String),
}

pub type PlaybackResult<T> = Result<T, PlaybackError>;
