//! Recording commands

use crate::recorder::{RecordingConfig, RecordingCoordinator, RecordingError, RecordingState};
use crate::utils::{AppError, ErrorResponse};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Application state for recording
pub struct RecorderState {
    pub coordinator: Arc<Mutex<RecordingCoordinator>>,

    /// Readable without the coordinator lock, which a countdown holds
    recording_state: Arc<RwLock<RecordingState>>,

    countdown_cancel: parking_lot::Mutex<Option<CancellationToken>>,

    /// Auto-stop task for the take being recorded
    watchdog: parking_lot::Mutex<Option<JoinHandle<()>>>,

    max_take: Duration,
}

impl RecorderState {
    pub fn new(coordinator: RecordingCoordinator, config: &RecordingConfig) -> Self {
        Self {
            recording_state: coordinator.state_handle(),
            coordinator: Arc::new(Mutex::new(coordinator)),
            countdown_cancel: parking_lot::Mutex::new(None),
            watchdog: parking_lot::Mutex::new(None),
            max_take: Duration::from_secs(config.max_take_secs),
        }
    }
}

impl Drop for RecorderState {
    fn drop(&mut self) {
        if let Some(watchdog) = self.watchdog.lock().take() {
            watchdog.abort();
        }
    }
}

/// A take that has been recorded but not saved yet
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedTake {
    pub id: Uuid,
    pub duration_ms: f64,
    pub size_bytes: usize,
    pub mime_type: String,
}

/// Count in and start recording a take
///
/// Returns once capture has started. The take is stopped automatically
/// after the configured maximum length.
pub async fn start_take(state: &RecorderState) -> Result<Uuid, ErrorResponse> {
    if !state.recording_state.read().can_start() {
        return Err(AppError::from(RecordingError::AlreadyRecording).into());
    }

    let token = CancellationToken::new();
    *state.countdown_cancel.lock() = Some(token.clone());

    let result = {
        let mut coordinator = state.coordinator.lock().await;
        coordinator.start(&token).await
    };
    state.countdown_cancel.lock().take();
    let take_id = result.map_err(AppError::from)?;

    let coordinator = Arc::clone(&state.coordinator);
    let limit = state.max_take;
    let watchdog = tokio::spawn(async move {
        tokio::time::sleep(limit).await;
        let mut coordinator = coordinator.lock().await;
        if coordinator.state() == RecordingState::Recording
            && coordinator.current_take() == Some(take_id)
        {
            tracing::warn!("Take {} reached {:?}, stopping", take_id, limit);
            if let Err(e) = coordinator.stop().await {
                tracing::warn!("Auto-stop failed: {}", e);
            }
        }
    });
    if let Some(previous) = state.watchdog.lock().replace(watchdog) {
        previous.abort();
    }

    Ok(take_id)
}

/// Cancel a running countdown
///
/// Returns whether a countdown was running.
pub fn cancel_countdown(state: &RecorderState) -> bool {
    match state.countdown_cancel.lock().take() {
        Some(token) => {
            tracing::info!("Cancelling countdown");
            token.cancel();
            true
        }
        None => false,
    }
}

/// Stop recording
pub async fn stop_take(state: &RecorderState) -> Result<RecordedTake, ErrorResponse> {
    if let Some(watchdog) = state.watchdog.lock().take() {
        watchdog.abort();
    }

    let mut coordinator = state.coordinator.lock().await;
    let take = coordinator.stop().await.map_err(AppError::from)?;

    Ok(RecordedTake {
        id: take.id,
        duration_ms: take.duration_ms,
        size_bytes: take.media.len(),
        mime_type: take.media.mime_type,
    })
}

/// Get current recording state
pub fn recording_state(state: &RecorderState) -> RecordingState {
    *state.recording_state.read()
}

/// Get current recording duration in milliseconds
pub fn recording_duration(state: &RecorderState) -> f64 {
    // The coordinator is only busy during a countdown, when nothing is recorded yet
    state
        .coordinator
        .try_lock()
        .map(|coordinator| coordinator.duration_ms())
        .unwrap_or(0.0)
}
