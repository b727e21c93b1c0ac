//! Playback session state
//!
//! Defines the chorus state machine, session membership and the events
//! broadcast while a session runs.

use crate::media::ClipSource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Current state of the chorus engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackState {
    /// No session has run yet, or the last start attempt failed readiness
    Idle,
    /// Waiting for every member to buffer
    AwaitingReady,
    /// All members playing, monitor running
    Playing,
    /// Session ended or was stopped
    Stopped,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::Idle
    }
}

/// Synchronization settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaybackConfig {
    /// Drift above which a member is snapped to the reference time
    pub drift_threshold_secs: f64,

    /// Monitor tick interval (one display refresh)
    pub refresh_interval_ms: u64,

    /// Readiness barrier timeout; `None` waits indefinitely
    pub ready_timeout_ms: Option<u64>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            drift_threshold_secs: 0.1,
            refresh_interval_ms: 16,
            ready_timeout_ms: Some(10_000),
        }
    }
}

impl PlaybackConfig {
    /// Monitor tick interval, never shorter than one millisecond
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms.max(1))
    }

    pub fn ready_timeout(&self) -> Option<Duration> {
        self.ready_timeout_ms.map(Duration::from_millis)
    }
}

/// A clip handle lent to a playback session
#[derive(Clone)]
pub struct SessionMember {
    pub clip_id: Uuid,
    pub name: String,
    pub source: Arc<dyn ClipSource>,
}

impl fmt::Debug for SessionMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionMember")
            .field("clip_id", &self.clip_id)
            .field("name", &self.name)
            .field("ready_state", &self.source.ready_state())
            .finish()
    }
}

/// One run of the chorus engine
///
/// Membership is fixed when the session is created.
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    pub id: Uuid,
    pub members: Vec<SessionMember>,
    pub started_at: DateTime<Utc>,
}

impl PlaybackSession {
    pub fn new(members: Vec<SessionMember>) -> Self {
        Self {
            id: Uuid::new_v4(),
            members,
            started_at: Utc::now(),
        }
    }

    pub fn contains(&self, clip_id: Uuid) -> bool {
        self.members.iter().any(|m| m.clip_id == clip_id)
    }
}

/// Outcome of one monitor tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// Members that were playing this tick
    pub playing: usize,
    /// Mean position of the playing members
    pub reference_time: f64,
    /// Largest drift seen before correction
    pub max_drift: f64,
    /// Members snapped to the reference time
    pub corrected: Vec<Uuid>,
}

/// Events emitted by the chorus engine
#[derive(Debug, Clone)]
pub enum PlaybackEvent {
    StateChanged(PlaybackState),
    Synced(SyncReport),
    CorrectionFailed { clip: String, message: String },
    Fault(String),
}
