//! Clip registry
//!
//! Ordered collection of finalized takes. The registry owns every clip's
//! media; playback sessions borrow handles through [`ClipRegistry::snapshot`].

pub mod clip;
pub mod layout;

pub use clip::{Clip, ClipSummary};
pub use layout::GridLayout;

use crate::playback::SessionMember;
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Registry errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("No clip at index {index} (registry holds {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Events emitted when the registry changes
#[derive(Debug, Clone)]
pub enum RegistryEvent {
    Added { id: Uuid, layout: GridLayout },
    Removed { id: Uuid, layout: GridLayout },
}

impl RegistryEvent {
    /// Grid arrangement after the change
    pub fn layout(&self) -> GridLayout {
        match self {
            Self::Added { layout, .. } | Self::Removed { layout, .. } => *layout,
        }
    }
}

/// Ordered set of finalized clips
pub struct ClipRegistry {
    clips: Vec<Clip>,
    event_tx: broadcast::Sender<RegistryEvent>,
}

impl ClipRegistry {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            clips: Vec::new(),
            event_tx,
        }
    }

    /// Subscribe to relayout notifications
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.event_tx.subscribe()
    }

    /// Append a clip, returning its index
    pub fn add(&mut self, clip: Clip) -> usize {
        let id = clip.id();
        tracing::info!("Adding clip '{}' ({})", clip.name(), id);
        self.clips.push(clip);

        let _ = self.event_tx.send(RegistryEvent::Added {
            id,
            layout: self.layout(),
        });
        self.clips.len() - 1
    }

    /// Remove the clip at `index` and release its media
    pub fn remove(&mut self, index: usize) -> RegistryResult<ClipSummary> {
        if index >= self.clips.len() {
            return Err(RegistryError::IndexOutOfRange {
                index,
                len: self.clips.len(),
            });
        }

        let clip = self.clips.remove(index);
        let summary = clip.summary();
        clip.release();
        tracing::info!("Removed clip '{}' ({})", summary.name, summary.id);

        let _ = self.event_tx.send(RegistryEvent::Removed {
            id: summary.id,
            layout: self.layout(),
        });
        Ok(summary)
    }

    /// Release every clip
    pub fn clear(&mut self) {
        let count = self.clips.len();
        for clip in self.clips.drain(..) {
            clip.release();
        }
        if count > 0 {
            tracing::debug!("Released {} clips", count);
        }
    }

    pub fn get(&self, index: usize) -> Option<&Clip> {
        self.clips.get(index)
    }

    pub fn position_of(&self, id: Uuid) -> Option<usize> {
        self.clips.iter().position(|clip| clip.id() == id)
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Clip> {
        self.clips.iter()
    }

    pub fn layout(&self) -> GridLayout {
        GridLayout::for_count(self.clips.len())
    }

    /// Ordered session handles for the playback engine
    pub fn snapshot(&self) -> Vec<SessionMember> {
        self.clips.iter().map(Clip::session_member).collect()
    }
}

impl Default for ClipRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ClipRegistry {
    fn drop(&mut self) {
        self.clear();
    }
}
