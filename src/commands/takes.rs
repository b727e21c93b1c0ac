//! Take management commands
//!
//! Save recorded takes into the registry, list and delete them.

use super::chorus::ChorusState;
use super::recording::RecorderState;
use crate::config::ChorusConfig;
use crate::media::{MediaBackend, SimulatedBackend};
use crate::registry::{Clip, ClipRegistry, ClipSummary, GridLayout, RegistryError};
use crate::utils::{AppError, ErrorResponse};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Application state for the recorded takes
pub struct AppState {
    pub registry: Arc<Mutex<ClipRegistry>>,
    pub backend: Arc<dyn MediaBackend>,
    pub config: ChorusConfig,
}

impl AppState {
    pub fn new(config: ChorusConfig, backend: Arc<dyn MediaBackend>) -> Self {
        Self {
            registry: Arc::new(Mutex::new(ClipRegistry::new())),
            backend,
            config,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(ChorusConfig::default(), Arc::new(SimulatedBackend::default()))
    }
}

/// List every saved take in display order
pub async fn list_takes(state: &AppState) -> Vec<ClipSummary> {
    let registry = state.registry.lock().await;
    registry.iter().map(Clip::summary).collect()
}

/// Save the take waiting in the recorder
///
/// An empty or missing name becomes `Recording {n}`.
pub async fn save_take(
    state: &AppState,
    recorder: &RecorderState,
    name: Option<String>,
) -> Result<ClipSummary, ErrorResponse> {
    let mut coordinator = recorder.coordinator.lock().await;
    let pending = coordinator.pending().ok_or_else(|| {
        AppError::from(crate::recorder::RecordingError::NoPendingTake)
    })?;

    // Open before taking the pending take so a failure keeps it
    let source = state.backend.open(&pending.media).map_err(AppError::from)?;
    let take = coordinator.finalize().map_err(AppError::from)?;
    drop(coordinator);

    let mut registry = state.registry.lock().await;
    let name = match name.map(|n| n.trim().to_string()) {
        Some(n) if !n.is_empty() => n,
        _ => format!("Recording {}", registry.len() + 1),
    };

    let clip = Clip::with_id(take.id, name, take.media, source);
    let summary = clip.summary();
    registry.add(clip);

    Ok(summary)
}

/// Delete the take at `index`
///
/// A chorus session that includes the take is stopped first.
pub async fn delete_take(
    state: &AppState,
    chorus: &ChorusState,
    index: usize,
) -> Result<ClipSummary, ErrorResponse> {
    let clip_id = {
        let registry = state.registry.lock().await;
        clip_at(&registry, index)?
    };

    // A start waiting on this take holds the engine until it is cancelled
    if chorus.is_member(clip_id) {
        chorus.cancel_pending_start();
    }

    // Engine before registry, the same order play_chorus takes them in
    let mut engine = chorus.engine.lock().await;
    let mut registry = state.registry.lock().await;

    // The take may have moved while the locks were released
    let index = registry
        .position_of(clip_id)
        .ok_or_else(|| {
            AppError::from(RegistryError::IndexOutOfRange {
                index,
                len: registry.len(),
            })
        })?;

    if engine.is_member(clip_id) {
        tracing::info!("Take {} is playing, stopping chorus before deleting", clip_id);
        engine.stop().await;
    }

    let summary = registry.remove(index).map_err(AppError::from)?;
    Ok(summary)
}

fn clip_at(registry: &ClipRegistry, index: usize) -> Result<Uuid, AppError> {
    registry
        .get(index)
        .map(Clip::id)
        .ok_or(RegistryError::IndexOutOfRange {
            index,
            len: registry.len(),
        })
        .map_err(AppError::from)
}

/// Grid arrangement for the current takes
pub async fn grid_layout(state: &AppState) -> GridLayout {
    state.registry.lock().await.layout()
}
