//! Pacing session state
//!
//! Tempo configuration and the observable state of a countdown/metronome run.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Slowest tempo the clock accepts
pub const MIN_BPM: f64 = 20.0;

/// Fastest tempo the clock accepts
pub const MAX_BPM: f64 = 400.0;

/// Pacing clock errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PacingError {
    #[error("Invalid tempo: {0} bpm")]
    InvalidTempo(f64),

    #[error("Invalid measure: {0} beats")]
    InvalidMeasure(u32),

    #[error("Countdown cancelled")]
    Cancelled,
}

/// Phase of the pre-roll countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PacingPhase {
    Idle,
    /// Numbered beats before the cue
    Counting,
    /// The "go" beat
    Cue,
}

impl Default for PacingPhase {
    fn default() -> Self {
        Self::Idle
    }
}

/// Tempo configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PacingConfig {
    /// Beats per minute
    pub bpm: f64,

    /// Beats in one metronome measure
    pub beats_per_measure: u32,

    /// Numbered beats before the cue beat
    pub countdown_beats: u32,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            bpm: 120.0,
            beats_per_measure: 4,
            countdown_beats: 4,
        }
    }
}

impl PacingConfig {
    pub fn validate(&self) -> Result<(), PacingError> {
        if !(MIN_BPM..=MAX_BPM).contains(&self.bpm) {
            return Err(PacingError::InvalidTempo(self.bpm));
        }
        if self.beats_per_measure == 0 {
            return Err(PacingError::InvalidMeasure(self.beats_per_measure));
        }
        Ok(())
    }

    /// Length of one beat (`60000 / bpm` milliseconds)
    ///
    /// A tempo outside `MIN_BPM..=MAX_BPM` is clamped into it.
    pub fn beat_period(&self) -> Duration {
        let bpm = if self.bpm.is_nan() {
            MIN_BPM
        } else {
            self.bpm.clamp(MIN_BPM, MAX_BPM)
        };
        Duration::from_secs_f64(60.0 / bpm)
    }

    /// Total countdown length: the numbered beats plus the cue beat
    pub fn countdown_duration(&self) -> Duration {
        self.beat_period() * (self.countdown_beats + 1)
    }
}

/// Observable state of the pacing clock
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PacingSession {
    pub bpm: f64,

    /// Highlighted beat within the measure
    pub beat_index: u32,

    pub phase: PacingPhase,

    /// Number currently shown by the countdown overlay
    pub countdown_remaining: Option<u32>,
}

impl PacingSession {
    pub fn new(bpm: f64) -> Self {
        Self {
            bpm,
            beat_index: 0,
            phase: PacingPhase::Idle,
            countdown_remaining: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_beat_period_at_default_tempo() {
        let config = PacingConfig::default();
        assert_eq!(config.beat_period(), Duration::from_millis(500));
        assert_eq!(config.countdown_duration(), Duration::from_millis(2500));
    }

    #[test]
    fn test_rejects_bad_tempo() {
        let config = PacingConfig {
            bpm: 0.0,
            ..PacingConfig::default()
        };
        assert_eq!(config.validate(), Err(PacingError::InvalidTempo(0.0)));

        let config = PacingConfig {
            bpm: f64::NAN,
            ..PacingConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_tempo_outside_range() {
        for bpm in [1e-300, 19.9, 400.5, 1e12, f64::INFINITY] {
            let config = PacingConfig {
                bpm,
                ..PacingConfig::default()
            };
            assert_eq!(config.validate(), Err(PacingError::InvalidTempo(bpm)));
        }

        for bpm in [MIN_BPM, MAX_BPM] {
            let config = PacingConfig {
                bpm,
                ..PacingConfig::default()
            };
            assert!(config.validate().is_ok());
        }
    }

    #[test]
    fn test_beat_period_clamps_extreme_tempo() {
        let slow = PacingConfig {
            bpm: 1e-300,
            ..PacingConfig::default()
        };
        assert_eq!(slow.beat_period(), Duration::from_secs(3));

        let fast = PacingConfig {
            bpm: 1e12,
            ..PacingConfig::default()
        };
        assert!((fast.beat_period().as_secs_f64() - 0.15).abs() < 1e-6);

        let nan = PacingConfig {
            bpm: f64::NAN,
            ..PacingConfig::default()
        };
        assert_eq!(nan.beat_period(), Duration::from_secs(3));
    }
}
