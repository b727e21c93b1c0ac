//! Pacing clock module
//!
//! Countdown and metronome used before a take is recorded.

pub mod clock;
pub mod state;

pub use clock::{PacingClock, PacingSurface};
pub use state::{PacingConfig, PacingError, PacingPhase, PacingSession, MAX_BPM, MIN_BPM};
