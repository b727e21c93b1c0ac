//! Media adapter traits
//!
//! Platform-agnostic capability set for playable clips. A concrete adapter
//! wraps whatever media primitive the host platform offers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

/// Load/playback state of a clip source
///
/// Variants are ordered by progress; `Errored` sorts last but is never
/// considered ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReadyState {
    NotLoaded,
    Loading,
    /// Enough data buffered to play through without stalling
    ReadyToPlay,
    Playing,
    Ended,
    Errored,
}

impl ReadyState {
    /// Whether the source can begin playback
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::ReadyToPlay | Self::Playing | Self::Ended)
    }

    /// Whether loading has finished one way or the other
    pub fn is_settled(&self) -> bool {
        self.is_ready() || *self == Self::Errored
    }
}

impl Default for ReadyState {
    fn default() -> Self {
        Self::NotLoaded
    }
}

/// Media adapter errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MediaError {
    #[error("Load failed: {0}")]
    LoadFailed(String),

    #[error("Playback rejected: {0}")]
    PlayRejected(String),

    #[error("Seek failed: {0}")]
    SeekFailed(String),

    #[error("Media resource has been released")]
    Released,
}

pub type MediaResult<T> = Result<T, MediaError>;

/// Finalized media content as produced by a capture channel
#[derive(Debug, Clone)]
pub struct MediaBuffer {
    pub bytes: Arc<[u8]>,
    pub mime_type: String,
}

impl MediaBuffer {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes: Arc::from(bytes),
            mime_type: mime_type.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A playable clip
///
/// Methods take `&self`; adapters use interior mutability so the playback
/// engine and its monitor can share one handle.
#[async_trait]
pub trait ClipSource: Send + Sync {
    /// Force a reload of the underlying content.
    ///
    /// Moves the ready state to `Loading`; later transitions are published
    /// through [`ClipSource::readiness`].
    async fn load(&self) -> MediaResult<()>;

    /// Begin playback. May be rejected (e.g. autoplay not permitted).
    async fn play(&self) -> MediaResult<()>;

    fn pause(&self);

    /// Jump to a position in seconds
    fn seek(&self, position_secs: f64) -> MediaResult<()>;

    fn set_muted(&self, muted: bool);

    fn is_muted(&self) -> bool;

    /// Visual "not currently performing" state
    fn set_dimmed(&self, dimmed: bool);

    /// Current position in seconds
    fn position(&self) -> f64;

    /// Total duration in seconds, if known
    fn duration(&self) -> Option<f64>;

    fn ready_state(&self) -> ReadyState;

    /// Subscribe to ready state transitions
    fn readiness(&self) -> watch::Receiver<ReadyState>;

    fn is_paused(&self) -> bool;

    fn is_ended(&self) -> bool;

    /// Release the underlying media resource. Further calls fail with
    /// [`MediaError::Released`].
    fn release(&self);
}

/// Opens playable sources for finalized media
pub trait MediaBackend: Send + Sync {
    fn open(&self, media: &MediaBuffer) -> MediaResult<Arc<dyn ClipSource>>;
}
