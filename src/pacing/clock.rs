//! Pacing clock
//!
//! Counts a performer into a take and runs the visual metronome. Both share
//! one tempo so every take starts from the same implicit downbeat.

use super::state::{PacingConfig, PacingError, PacingPhase, PacingSession};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Drawing surface for the countdown overlay and beat indicator
///
/// Every method defaults to a no-op so a surface only implements what it
/// can show.
pub trait PacingSurface: Send + Sync {
    fn show_count(&self, _remaining: u32) {}

    fn show_cue(&self) {}

    fn hide_overlay(&self) {}

    /// Highlight `beat` out of `beats_per_measure`
    fn draw_beat(&self, _beat: u32, _beats_per_measure: u32) {}

    fn clear_beats(&self) {}
}

struct MetronomeHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

/// Countdown and metronome timing source
pub struct PacingClock {
    config: PacingConfig,
    surface: Option<Arc<dyn PacingSurface>>,
    session: Arc<RwLock<PacingSession>>,
    metronome: Option<MetronomeHandle>,
}

impl PacingClock {
    pub fn new(config: PacingConfig) -> Result<Self, PacingError> {
        config.validate()?;
        let session = PacingSession::new(config.bpm);
        Ok(Self {
            config,
            surface: None,
            session: Arc::new(RwLock::new(session)),
            metronome: None,
        })
    }

    /// Attach a drawing surface
    pub fn with_surface(mut self, surface: Arc<dyn PacingSurface>) -> Self {
        self.surface = Some(surface);
        self
    }

    pub fn config(&self) -> &PacingConfig {
        &self.config
    }

    pub fn beat_period(&self) -> Duration {
        self.config.beat_period()
    }

    /// Snapshot of the current pacing state
    pub fn session(&self) -> PacingSession {
        self.session.read().clone()
    }

    pub fn is_metronome_running(&self) -> bool {
        self.metronome.is_some()
    }

    /// Run the pre-roll countdown.
    ///
    /// Shows the numbered beats followed by one cue beat, one beat period
    /// each, with the metronome running alongside. The metronome is left
    /// running on success. Cancelling `cancel` aborts the countdown, stops
    /// the metronome and clears the overlay.
    pub async fn start_countdown(&mut self, cancel: &CancellationToken) -> Result<(), PacingError> {
        tracing::info!(
            "Starting countdown at {} bpm ({} beats + cue)",
            self.config.bpm,
            self.config.countdown_beats
        );

        self.start_metronome();

        if let Err(e) = self.run_countdown(cancel).await {
            tracing::info!("Countdown aborted: {}", e);
            self.stop_metronome();
            self.finish_countdown();
            return Err(e);
        }

        self.finish_countdown();
        tracing::debug!("Countdown complete");
        Ok(())
    }

    async fn run_countdown(&self, cancel: &CancellationToken) -> Result<(), PacingError> {
        let period = self.beat_period();

        for remaining in (1..=self.config.countdown_beats).rev() {
            {
                let mut session = self.session.write();
                session.phase = PacingPhase::Counting;
                session.countdown_remaining = Some(remaining);
            }
            if let Some(surface) = &self.surface {
                surface.show_count(remaining);
            }
            wait_beat(period, cancel).await?;
        }

        {
            let mut session = self.session.write();
            session.phase = PacingPhase::Cue;
            session.countdown_remaining = None;
        }
        if let Some(surface) = &self.surface {
            surface.show_cue();
        }
        wait_beat(period, cancel).await
    }

    fn finish_countdown(&self) {
        {
            let mut session = self.session.write();
            session.phase = PacingPhase::Idle;
            session.countdown_remaining = None;
        }
        if let Some(surface) = &self.surface {
            surface.hide_overlay();
        }
    }

    /// Start the periodic beat indicator.
    ///
    /// Draws immediately, then once per beat period. Calling this while the
    /// metronome runs replaces the running tick task.
    pub fn start_metronome(&mut self) {
        self.cancel_metronome();

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let period = self.beat_period();
        let beats = self.config.beats_per_measure;
        let surface = self.surface.clone();
        let session = Arc::clone(&self.session);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut beat = 0;

            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {
                        session.write().beat_index = beat;
                        if let Some(surface) = &surface {
                            surface.draw_beat(beat, beats);
                        }
                        beat = (beat + 1) % beats;
                    }
                }
            }
        });

        self.metronome = Some(MetronomeHandle { token, task });
        tracing::debug!("Metronome started ({:?} per beat)", period);
    }

    /// Stop the beat indicator and clear it. No-op when not running.
    pub fn stop_metronome(&mut self) {
        if self.cancel_metronome() {
            self.session.write().beat_index = 0;
            if let Some(surface) = &self.surface {
                surface.clear_beats();
            }
            tracing::debug!("Metronome stopped");
        }
    }

    fn cancel_metronome(&mut self) -> bool {
        match self.metronome.take() {
            Some(handle) => {
                handle.token.cancel();
                handle.task.abort();
                true
            }
            None => false,
        }
    }
}

impl Drop for PacingClock {
    fn drop(&mut self) {
        self.cancel_metronome();
    }
}

async fn wait_beat(period: Duration, cancel: &CancellationToken) -> Result<(), PacingError> {
    tokio::select! {
        _ = cancel.cancelled() => Err(PacingError::Cancelled),
        _ = tokio::time::sleep(period) => Ok(()),
    }
}
