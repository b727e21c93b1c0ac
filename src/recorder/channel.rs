//! Capture channel trait
//!
//! A capture channel turns a live audio+video source into finalized media
//! chunks. Device enumeration and codec negotiation happen behind it.

use crate::pacing::PacingError;
use async_trait::async_trait;
use thiserror::Error;

/// Recording-related errors
#[derive(Error, Debug)]
pub enum RecordingError {
    #[error("A take is already being recorded")]
    AlreadyRecording,

    #[error("No take is being recorded")]
    NotRecording,

    #[error("No media data was recorded")]
    NoData,

    #[error("No capture channel configured")]
    NoChannel,

    #[error("No recorded take is waiting to be saved")]
    NoPendingTake,

    #[error("Capture error: {0}")]
    Capture(String),

    #[error("Countdown error: {0}")]
    Pacing(#[from] PacingError),
}

pub type RecordingResult<T> = Result<T, RecordingError>;

/// A source of recorded media
#[async_trait]
pub trait CaptureChannel: Send + Sync {
    /// Channel identifier for logging
    fn id(&self) -> &str;

    /// MIME type of the produced media
    fn mime_type(&self) -> &str;

    async fn start(&mut self) -> RecordingResult<()>;

    /// Stop capturing and hand over the recorded chunks
    async fn stop(&mut self) -> RecordingResult<Vec<Vec<u8>>>;

    fn is_recording(&self) -> bool;
}
