//! Error types and handling
//!
//! Common error types used across the application.

use crate::export::ExportError;
use crate::media::MediaError;
use crate::pacing::PacingError;
use crate::playback::PlaybackError;
use crate::recorder::RecordingError;
use crate::registry::RegistryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Pacing(#[from] PacingError),

    #[error(transparent)]
    Playback(#[from] PlaybackError),

    #[error(transparent)]
    Recording(#[from] RecordingError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

/// Error response for the presentation layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ErrorResponse {}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        let code = match &error {
            AppError::Io(_) => "IO_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Pacing(PacingError::Cancelled) => "COUNTDOWN_CANCELLED",
            AppError::Pacing(_) => "PACING_ERROR",
            AppError::Playback(e) => match e {
                PlaybackError::EmptyInput => "EMPTY_INPUT",
                PlaybackError::Readiness { .. } => "READINESS_ERROR",
                PlaybackError::PlaybackStart { .. } => "PLAYBACK_START_ERROR",
                PlaybackError::Correction { .. } => "CORRECTION_ERROR",
                PlaybackError::MonitorFault(_) => "MONITOR_FAULT",
            },
            AppError::Recording(RecordingError::Pacing(PacingError::Cancelled)) => {
                "COUNTDOWN_CANCELLED"
            }
            AppError::Recording(_) => "RECORDING_ERROR",
            AppError::Registry(_) => "REGISTRY_ERROR",
            AppError::Media(_) => "MEDIA_ERROR",
            AppError::Export(_) => "EXPORT_ERROR",
        };

        ErrorResponse {
            code: code.to_string(),
            message: error.to_string(),
        }
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playback_errors_map_to_distinct_codes() {
        let empty: ErrorResponse = AppError::from(PlaybackError::EmptyInput).into();
        assert_eq!(empty.code, "EMPTY_INPUT");

        let readiness: ErrorResponse = AppError::from(PlaybackError::Readiness {
            clip: "Recording 2".to_string(),
            reason: "failed to load".to_string(),
        })
        .into();
        assert_eq!(readiness.code, "READINESS_ERROR");
        assert!(readiness.message.contains("Recording 2"));
    }

    #[test]
    fn test_cancelled_countdown_code() {
        let response: ErrorResponse =
            AppError::from(RecordingError::Pacing(PacingError::Cancelled)).into();
        assert_eq!(response.code, "COUNTDOWN_CANCELLED");
    }
}
