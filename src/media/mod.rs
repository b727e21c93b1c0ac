//! Media adapters
//!
//! The capability interface the playback engine drives, and an in-memory
//! implementation of it.

pub mod simulated;
pub mod traits;

pub use simulated::{
    ClipBehavior, SimulatedBackend, SimulatedCapture, SimulatedClip, SIMULATED_BYTES_PER_SEC,
};
pub use traits::{
    ClipSource, MediaBackend, MediaBuffer, MediaError, MediaResult, ReadyState,
};
