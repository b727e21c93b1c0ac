//! Take recorder
//!
//! Counts in with the pacing clock, captures one take through a
//! [`CaptureChannel`] and holds it until it is saved to the registry.

pub mod channel;
pub mod coordinator;
pub mod state;

pub use channel::{CaptureChannel, RecordingError, RecordingResult};
pub use coordinator::{RecordingCoordinator, RecordingEvent};
pub use state::{PendingTake, RecordingConfig, RecordingState};
