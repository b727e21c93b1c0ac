//! Chorus playback commands

use super::takes::AppState;
use crate::playback::{ChorusEngine, PlaybackEvent, PlaybackState};
use crate::utils::{AppError, ErrorResponse};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Application state for chorus playback
pub struct ChorusState {
    pub engine: Arc<Mutex<ChorusEngine>>,
    playback_state: Arc<RwLock<PlaybackState>>,
    member_ids: Arc<RwLock<Vec<Uuid>>>,

    /// Cancels starts that are queued or waiting for readiness. Lives
    /// outside the engine mutex, which a start holds until it returns.
    start_cancel: parking_lot::Mutex<CancellationToken>,
}

impl ChorusState {
    pub fn new(engine: ChorusEngine) -> Self {
        Self {
            playback_state: engine.state_handle(),
            member_ids: engine.member_handle(),
            engine: Arc::new(Mutex::new(engine)),
            start_cancel: parking_lot::Mutex::new(CancellationToken::new()),
        }
    }

    /// Whether `clip_id` belongs to a session that is starting or playing
    pub fn is_member(&self, clip_id: Uuid) -> bool {
        let live = matches!(
            *self.playback_state.read(),
            PlaybackState::AwaitingReady | PlaybackState::Playing
        );
        live && self.member_ids.read().contains(&clip_id)
    }

    /// Abandon every start issued so far; later starts are unaffected
    pub fn cancel_pending_start(&self) {
        let token = std::mem::replace(&mut *self.start_cancel.lock(), CancellationToken::new());
        token.cancel();
    }
}

/// Play every saved take together
pub async fn play_chorus(state: &AppState, chorus: &ChorusState) -> Result<Uuid, ErrorResponse> {
    let cancel = chorus.start_cancel.lock().clone();
    let mut engine = chorus.engine.lock().await;
    let members = state.registry.lock().await.snapshot();

    tracing::info!("Playing chorus of {} takes", members.len());
    let session_id = engine
        .start_with_cancel(members, &cancel)
        .await
        .map_err(AppError::from)?;
    Ok(session_id)
}

/// Stop chorus playback
///
/// A start still waiting for its clips is abandoned and returns to idle.
pub async fn stop_chorus(chorus: &ChorusState) {
    chorus.cancel_pending_start();
    chorus.engine.lock().await.stop().await;
}

/// Get current playback state
pub fn chorus_state(chorus: &ChorusState) -> PlaybackState {
    *chorus.playback_state.read()
}

/// Subscribe to playback events
pub async fn chorus_events(chorus: &ChorusState) -> broadcast::Receiver<PlaybackEvent> {
    chorus.engine.lock().await.subscribe()
}
