//! Recorded clip
//!
//! One finalized take: its media buffer, the playable source opened over it
//! and user-facing metadata.

use crate::export::ExportTake;
use crate::media::{ClipSource, MediaBuffer, ReadyState};
use crate::playback::SessionMember;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// A finalized take owned by the registry
pub struct Clip {
    id: Uuid,
    name: String,
    created_at: DateTime<Utc>,
    media: MediaBuffer,
    source: Arc<dyn ClipSource>,
}

impl Clip {
    pub fn new(name: impl Into<String>, media: MediaBuffer, source: Arc<dyn ClipSource>) -> Self {
        Self::with_id(Uuid::new_v4(), name, media, source)
    }

    /// Create a clip that keeps the id of the take it was recorded as
    pub fn with_id(
        id: Uuid,
        name: impl Into<String>,
        media: MediaBuffer,
        source: Arc<dyn ClipSource>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            created_at: Utc::now(),
            media,
            source,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn mime_type(&self) -> &str {
        &self.media.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.media.bytes
    }

    pub fn source(&self) -> &Arc<dyn ClipSource> {
        &self.source
    }

    pub fn ready_state(&self) -> ReadyState {
        self.source.ready_state()
    }

    /// Handle lent to a playback session
    pub fn session_member(&self) -> SessionMember {
        SessionMember {
            clip_id: self.id,
            name: self.name.clone(),
            source: Arc::clone(&self.source),
        }
    }

    /// Owned copy of what the exporter needs
    pub fn export_take(&self) -> ExportTake {
        ExportTake {
            name: self.name.clone(),
            mime_type: self.media.mime_type.clone(),
            duration_secs: self.source.duration(),
            bytes: Arc::clone(&self.media.bytes),
        }
    }

    pub fn summary(&self) -> ClipSummary {
        ClipSummary {
            id: self.id,
            name: self.name.clone(),
            mime_type: self.media.mime_type.clone(),
            duration_secs: self.source.duration(),
            size_bytes: self.media.len(),
            created_at: self.created_at,
        }
    }

    /// Release the playable source and drop the media buffer
    pub(crate) fn release(self) {
        self.source.release();
        tracing::debug!("Released media for clip '{}' ({})", self.name, self.id);
    }
}

impl fmt::Debug for Clip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clip")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("mime_type", &self.media.mime_type)
            .field("size_bytes", &self.media.len())
            .finish()
    }
}

/// Serializable clip metadata for list views
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipSummary {
    pub id: Uuid,
    pub name: String,
    pub mime_type: String,
    pub duration_secs: Option<f64>,
    pub size_bytes: usize,
    pub created_at: DateTime<Utc>,
}
