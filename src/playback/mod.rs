//! Chorus playback
//!
//! Synchronized start and drift-corrected playback of every recorded take.

pub mod barrier;
pub mod engine;
pub mod error;
pub mod monitor;
pub mod state;

pub use barrier::await_ready;
pub use engine::ChorusEngine;
pub use error::{PlaybackError, PlaybackResult};
pub use monitor::{sync_tick, TickOutcome};
pub use state::{
    PlaybackConfig, PlaybackEvent, PlaybackSession, PlaybackState, SessionMember, SyncReport,
};
