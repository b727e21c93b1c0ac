//! Application configuration
//!
//! A single JSON document; every field is optional and falls back to its
//! default.

use crate::export::ExportOptions;
use crate::pacing::PacingConfig;
use crate::playback::PlaybackConfig;
use crate::recorder::RecordingConfig;
use crate::utils::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChorusConfig {
    pub pacing: PacingConfig,
    pub playback: PlaybackConfig,
    pub recording: RecordingConfig,
    pub export: ExportOptions,
}

impl ChorusConfig {
    /// Load and validate a config file
    pub fn load(path: &Path) -> AppResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: ChorusConfig = serde_json::from_str(&content)?;
        config.validate()?;

        tracing::debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Load `path` if given, otherwise use the defaults
    pub fn load_or_default(path: Option<&Path>) -> AppResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        self.pacing.validate()?;

        let threshold = self.playback.drift_threshold_secs;
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(AppError::Config(format!(
                "drift threshold must be positive, got {}",
                threshold
            )));
        }
        if self.playback.refresh_interval_ms == 0 {
            return Err(AppError::Config(
                "refresh interval must be at least 1ms".to_string(),
            ));
        }
        if self.recording.max_take_secs == 0 {
            return Err(AppError::Config(
                "maximum take length must be at least 1s".to_string(),
            ));
        }

        Ok(())
    }
}
