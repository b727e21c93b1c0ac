//! Open Chorus - record takes one by one, play them back together.
//!
//! This is the main library crate. It wires the take recorder, the clip
//! registry and the synchronized chorus engine behind the command handlers.

pub mod commands;
pub mod config;
pub mod export;
pub mod media;
pub mod pacing;
pub mod playback;
pub mod recorder;
pub mod registry;
pub mod utils;

use commands::{AppState, ChorusState, ExportState, RecorderState};
use config::ChorusConfig;
use media::MediaBackend;
use pacing::{PacingClock, PacingSurface};
use playback::ChorusEngine;
use recorder::{CaptureChannel, RecordingCoordinator};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utils::AppResult;

/// Initialize tracing/logging
///
/// `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "open_chorus_lib=debug,open_chorus=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// All application state, ready to hand to a front end
pub struct ChorusApp {
    pub state: AppState,
    pub recorder: RecorderState,
    pub chorus: ChorusState,
    pub export: ExportState,
}

impl ChorusApp {
    /// Build the application from a validated config
    pub fn new(
        config: ChorusConfig,
        backend: Arc<dyn MediaBackend>,
        capture: Box<dyn CaptureChannel>,
        surface: Option<Arc<dyn PacingSurface>>,
    ) -> AppResult<Self> {
        config.validate()?;

        let mut pacing = PacingClock::new(config.pacing.clone())?;
        if let Some(surface) = surface {
            pacing = pacing.with_surface(surface);
        }
        let mut coordinator = RecordingCoordinator::new(pacing);
        coordinator.set_channel(capture);

        tracing::info!("Starting Open Chorus v{}", env!("CARGO_PKG_VERSION"));

        Ok(Self {
            recorder: RecorderState::new(coordinator, &config.recording),
            chorus: ChorusState::new(ChorusEngine::new(config.playback.clone())),
            export: ExportState::default(),
            state: AppState::new(config, backend),
        })
    }
}
