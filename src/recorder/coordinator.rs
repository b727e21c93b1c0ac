//! Recording coordinator
//!
//! Runs the countdown, drives the capture channel and holds the finished
//! take until it is saved.

use super::channel::{CaptureChannel, RecordingError, RecordingResult};
use super::state::{PendingTake, RecordingState};
use crate::media::MediaBuffer;
use crate::pacing::PacingClock;
use chrono::Utc;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Events emitted during recording
#[derive(Debug, Clone)]
pub enum RecordingEvent {
    /// Countdown started
    CountdownStarted,
    /// Capture started for the take
    Started(Uuid),
    /// Take captured and waiting to be saved
    Stopped(Uuid),
    /// Countdown was cancelled before capture began
    Cancelled,
    /// Error occurred
    Error(String),
}

/// Records one take at a time
pub struct RecordingCoordinator {
    /// Current recording state
    state: Arc<RwLock<RecordingState>>,

    channel: Option<Box<dyn CaptureChannel>>,

    pacing: PacingClock,

    /// Id of the take being counted in or recorded
    current_take: Option<Uuid>,

    /// Captured take not yet handed out
    pending: Option<PendingTake>,

    /// Time capture started
    start_time: Option<Instant>,

    /// Event broadcaster
    event_tx: broadcast::Sender<RecordingEvent>,
}

impl RecordingCoordinator {
    pub fn new(pacing: PacingClock) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(RecordingState::Idle)),
            channel: None,
            pacing,
            current_take: None,
            pending: None,
            start_time: None,
            event_tx,
        }
    }

    /// Set the capture channel used for subsequent takes
    pub fn set_channel(&mut self, channel: Box<dyn CaptureChannel>) {
        tracing::info!("Using capture channel: {}", channel.id());
        self.channel = Some(channel);
    }

    /// Get the current recording state
    pub fn state(&self) -> RecordingState {
        *self.state.read()
    }

    /// Shared view of the state, readable while a countdown holds the coordinator
    pub fn state_handle(&self) -> Arc<RwLock<RecordingState>> {
        Arc::clone(&self.state)
    }

    /// Subscribe to recording events
    pub fn subscribe(&self) -> broadcast::Receiver<RecordingEvent> {
        self.event_tx.subscribe()
    }

    pub fn pacing(&self) -> &PacingClock {
        &self.pacing
    }

    pub fn current_take(&self) -> Option<Uuid> {
        self.current_take
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<&PendingTake> {
        self.pending.as_ref()
    }

    pub fn is_capturing(&self) -> bool {
        self.channel.as_ref().is_some_and(|c| c.is_recording())
    }

    /// Elapsed capture time of the current take in milliseconds
    pub fn duration_ms(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64() * 1000.0)
            .unwrap_or(0.0)
    }

    fn set_state(&self, next: RecordingState) {
        *self.state.write() = next;
    }

    /// Count in and start capturing a new take.
    ///
    /// Cancelling `cancel` during the countdown returns to idle without
    /// touching the capture channel. The metronome keeps running while the
    /// take records.
    pub async fn start(&mut self, cancel: &CancellationToken) -> RecordingResult<Uuid> {
        if !self.state().can_start() {
            return Err(RecordingError::AlreadyRecording);
        }
        if self.channel.is_none() {
            return Err(RecordingError::NoChannel);
        }
        if self.pending.take().is_some() {
            tracing::warn!("Discarding unsaved take");
        }

        let take_id = Uuid::new_v4();
        self.current_take = Some(take_id);
        self.set_state(RecordingState::CountingIn);
        let _ = self.event_tx.send(RecordingEvent::CountdownStarted);

        if let Err(e) = self.pacing.start_countdown(cancel).await {
            self.current_take = None;
            self.set_state(RecordingState::Idle);
            let _ = self.event_tx.send(RecordingEvent::Cancelled);
            return Err(e.into());
        }

        let started = match self.channel.as_mut() {
            Some(channel) => channel.start().await,
            None => Err(RecordingError::NoChannel),
        };
        if let Err(e) = started {
            tracing::error!("Failed to start capture: {}", e);
            self.pacing.stop_metronome();
            self.current_take = None;
            self.set_state(RecordingState::Idle);
            let _ = self.event_tx.send(RecordingEvent::Error(e.to_string()));
            return Err(e);
        }

        self.start_time = Some(Instant::now());
        self.set_state(RecordingState::Recording);
        let _ = self.event_tx.send(RecordingEvent::Started(take_id));

        tracing::info!("Recording take {}", take_id);
        Ok(take_id)
    }

    /// Stop the take and keep it as the pending take
    pub async fn stop(&mut self) -> RecordingResult<PendingTake> {
        if self.state() != RecordingState::Recording {
            return Err(RecordingError::NotRecording);
        }

        tracing::info!("Stopping recording");
        self.pacing.stop_metronome();
        let duration_ms = self.duration_ms();
        self.start_time = None;
        let take_id = self.current_take.take().unwrap_or_else(Uuid::new_v4);

        let (stopped, mime_type) = match self.channel.as_mut() {
            Some(channel) => (channel.stop().await, channel.mime_type().to_string()),
            None => (Err(RecordingError::NoChannel), String::new()),
        };
        let chunks = match stopped {
            Ok(chunks) => chunks,
            Err(e) => {
                tracing::error!("Failed to stop capture: {}", e);
                self.set_state(RecordingState::Idle);
                let _ = self.event_tx.send(RecordingEvent::Error(e.to_string()));
                return Err(e);
            }
        };

        let bytes = chunks.concat();
        if bytes.is_empty() {
            tracing::warn!("Take {} produced no data", take_id);
            self.set_state(RecordingState::Idle);
            let _ = self
                .event_tx
                .send(RecordingEvent::Error(RecordingError::NoData.to_string()));
            return Err(RecordingError::NoData);
        }

        let take = PendingTake {
            id: take_id,
            media: MediaBuffer::new(bytes, mime_type),
            duration_ms,
            recorded_at: Utc::now(),
        };
        self.pending = Some(take.clone());
        self.set_state(RecordingState::Stopped);
        let _ = self.event_tx.send(RecordingEvent::Stopped(take_id));

        tracing::info!(
            "Take {} stopped. Duration: {:.0}ms, {} bytes",
            take_id,
            duration_ms,
            take.media.len()
        );
        Ok(take)
    }

    /// Hand out the pending take
    pub fn finalize(&mut self) -> RecordingResult<PendingTake> {
        self.pending.take().ok_or(RecordingError::NoPendingTake)
    }
}
