//! Recording state management
//!
//! Defines the take recorder state machine and the take waiting to be saved.

use crate::media::MediaBuffer;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current state of the take recorder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecordingState {
    /// Nothing recorded yet, or the last attempt was cancelled
    Idle,
    /// Countdown running, capture not started
    CountingIn,
    /// Currently recording
    Recording,
    /// A take was captured and is waiting to be saved
    Stopped,
}

impl Default for RecordingState {
    fn default() -> Self {
        Self::Idle
    }
}

impl RecordingState {
    /// Whether a new take may be started from this state
    pub fn can_start(&self) -> bool {
        matches!(self, Self::Idle | Self::Stopped)
    }
}

/// A captured take that has not been added to the registry yet
#[derive(Debug, Clone)]
pub struct PendingTake {
    pub id: Uuid,
    pub media: MediaBuffer,
    pub duration_ms: f64,
    pub recorded_at: DateTime<Utc>,
}

/// Take recorder settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordingConfig {
    /// Takes still recording after this long are stopped automatically
    pub max_take_secs: u64,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self { max_take_secs: 120 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_idle_or_stopped_can_start() {
        assert!(RecordingState::Idle.can_start());
        assert!(RecordingState::Stopped.can_start());
        assert!(!RecordingState::CountingIn.can_start());
        assert!(!RecordingState::Recording.can_start());
    }

    #[test]
    fn test_config_fills_missing_fields() {
        let config: RecordingConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.max_take_secs, 120);

        let config: RecordingConfig = serde_json::from_str(r#"{"maxTakeSecs": 30}"#).unwrap();
        assert_eq!(config.max_take_secs, 30);
    }
}
