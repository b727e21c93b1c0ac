//! Simulated media adapter
//!
//! In-memory clips whose playhead runs on the tokio clock. Used by the demo
//! binary and the tests: playback rate and failures can be injected per
//! clip so drift and broken takes are reproducible.

use super::traits::{ClipSource, MediaBackend, MediaBuffer, MediaError, MediaResult, ReadyState};
use crate::recorder::channel::{CaptureChannel, RecordingError, RecordingResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Simulated bitrate; clip durations are derived from byte length
pub const SIMULATED_BYTES_PER_SEC: usize = 4096;

/// Injected behaviour of a simulated clip
#[derive(Debug, Clone)]
pub struct ClipBehavior {
    /// Time between `load()` and the ready (or error) transition
    pub load_delay: Duration,
    /// Playhead speed relative to the clock (1.0 = realtime)
    pub rate: f64,
    pub fail_load: bool,
    /// Never leave `Loading`
    pub stall: bool,
    pub fail_play: bool,
    pub fail_seek: bool,
}

impl Default for ClipBehavior {
    fn default() -> Self {
        Self {
            load_delay: Duration::from_millis(50),
            rate: 1.0,
            fail_load: false,
            stall: false,
            fail_play: false,
            fail_seek: false,
        }
    }
}

struct Playhead {
    content: Option<Arc<[u8]>>,
    base_position: f64,
    resumed_at: Option<Instant>,
    muted: bool,
    dimmed: bool,
    load_generation: u64,
    play_calls: usize,
    seeks: Vec<f64>,
}

struct Shared {
    duration: f64,
    behavior: ClipBehavior,
    playhead: Mutex<Playhead>,
    ready_tx: watch::Sender<ReadyState>,
}

/// A clip backed by an in-memory buffer
pub struct SimulatedClip {
    shared: Arc<Shared>,
}

impl SimulatedClip {
    pub fn new(content: Arc<[u8]>, duration: f64, behavior: ClipBehavior) -> Self {
        let (ready_tx, _) = watch::channel(ReadyState::NotLoaded);
        Self {
            shared: Arc::new(Shared {
                duration,
                behavior,
                playhead: Mutex::new(Playhead {
                    content: Some(content),
                    base_position: 0.0,
                    resumed_at: None,
                    muted: true,
                    dimmed: false,
                    load_generation: 0,
                    play_calls: 0,
                    seeks: Vec::new(),
                }),
                ready_tx,
            }),
        }
    }

    /// Clip with zero-filled content of the given length in seconds
    pub fn with_duration(duration: f64, behavior: ClipBehavior) -> Self {
        let len = (duration * SIMULATED_BYTES_PER_SEC as f64) as usize;
        Self::new(Arc::from(vec![0u8; len]), duration, behavior)
    }

    /// Number of `play()` calls received, successful or not
    pub fn play_calls(&self) -> usize {
        self.shared.playhead.lock().play_calls
    }

    /// Every accepted seek target, in order
    pub fn seeks(&self) -> Vec<f64> {
        self.shared.playhead.lock().seeks.clone()
    }

    pub fn is_dimmed(&self) -> bool {
        self.shared.playhead.lock().dimmed
    }

    pub fn is_released(&self) -> bool {
        self.shared.playhead.lock().content.is_none()
    }

    fn position_of(&self, playhead: &Playhead) -> f64 {
        match playhead.resumed_at {
            Some(at) => (playhead.base_position
                + at.elapsed().as_secs_f64() * self.shared.behavior.rate)
                .min(self.shared.duration),
            None => playhead.base_position,
        }
    }

    fn reached_end(&self, playhead: &Playhead) -> bool {
        playhead.resumed_at.is_some() && self.position_of(playhead) >= self.shared.duration
    }
}

#[async_trait]
impl ClipSource for SimulatedClip {
    async fn load(&self) -> MediaResult<()> {
        let generation = {
            let mut playhead = self.shared.playhead.lock();
            if playhead.content.is_none() {
                return Err(MediaError::Released);
            }
            playhead.resumed_at = None;
            playhead.base_position = 0.0;
            playhead.load_generation += 1;
            playhead.load_generation
        };
        self.shared.ready_tx.send_replace(ReadyState::Loading);

        if self.shared.behavior.stall {
            return Ok(());
        }

        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            tokio::time::sleep(shared.behavior.load_delay).await;
            let playhead = shared.playhead.lock();
            // A newer load or a release supersedes this one
            if playhead.load_generation != generation || playhead.content.is_none() {
                return;
            }
            let next = if shared.behavior.fail_load {
                ReadyState::Errored
            } else {
                ReadyState::ReadyToPlay
            };
            shared.ready_tx.send_replace(next);
        });

        Ok(())
    }

    async fn play(&self) -> MediaResult<()> {
        let mut playhead = self.shared.playhead.lock();
        playhead.play_calls += 1;

        if playhead.content.is_none() {
            return Err(MediaError::Released);
        }
        if self.shared.behavior.fail_play {
            return Err(MediaError::PlayRejected(
                "playback not permitted".to_string(),
            ));
        }

        let state = *self.shared.ready_tx.borrow();
        if !state.is_ready() {
            return Err(MediaError::PlayRejected(format!(
                "source not ready ({:?})",
                state
            )));
        }

        if state == ReadyState::Ended || self.reached_end(&playhead) {
            playhead.base_position = 0.0;
            playhead.resumed_at = None;
        }
        if playhead.resumed_at.is_none() {
            playhead.resumed_at = Some(Instant::now());
        }
        drop(playhead);

        self.shared.ready_tx.send_replace(ReadyState::Playing);
        Ok(())
    }

    fn pause(&self) {
        let mut playhead = self.shared.playhead.lock();
        let ended = self.reached_end(&playhead);
        if playhead.resumed_at.is_some() {
            playhead.base_position = self.position_of(&playhead);
            playhead.resumed_at = None;
        }
        drop(playhead);

        let state = *self.shared.ready_tx.borrow();
        if state == ReadyState::Playing {
            let next = if ended {
                ReadyState::Ended
            } else {
                ReadyState::ReadyToPlay
            };
            self.shared.ready_tx.send_replace(next);
        }
    }

    fn seek(&self, position_secs: f64) -> MediaResult<()> {
        if self.shared.behavior.fail_seek {
            return Err(MediaError::SeekFailed("seeking not supported".to_string()));
        }
        if !position_secs.is_finite() || position_secs < 0.0 {
            return Err(MediaError::SeekFailed(format!(
                "invalid position {}",
                position_secs
            )));
        }

        let mut playhead = self.shared.playhead.lock();
        if playhead.content.is_none() {
            return Err(MediaError::Released);
        }
        let target = position_secs.min(self.shared.duration);
        playhead.base_position = target;
        playhead.seeks.push(target);

        let state = *self.shared.ready_tx.borrow();
        if state == ReadyState::Ended && target < self.shared.duration {
            playhead.resumed_at = None;
            drop(playhead);
            self.shared.ready_tx.send_replace(ReadyState::ReadyToPlay);
        } else if playhead.resumed_at.is_some() {
            playhead.resumed_at = Some(Instant::now());
        }

        Ok(())
    }

    fn set_muted(&self, muted: bool) {
        self.shared.playhead.lock().muted = muted;
    }

    fn is_muted(&self) -> bool {
        self.shared.playhead.lock().muted
    }

    fn set_dimmed(&self, dimmed: bool) {
        self.shared.playhead.lock().dimmed = dimmed;
    }

    fn position(&self) -> f64 {
        let playhead = self.shared.playhead.lock();
        self.position_of(&playhead)
    }

    fn duration(&self) -> Option<f64> {
        Some(self.shared.duration)
    }

    fn ready_state(&self) -> ReadyState {
        let playhead = self.shared.playhead.lock();
        let state = *self.shared.ready_tx.borrow();
        if state == ReadyState::Playing && self.reached_end(&playhead) {
            self.shared.ready_tx.send_replace(ReadyState::Ended);
            return ReadyState::Ended;
        }
        state
    }

    fn readiness(&self) -> watch::Receiver<ReadyState> {
        self.shared.ready_tx.subscribe()
    }

    fn is_paused(&self) -> bool {
        self.shared.playhead.lock().resumed_at.is_none()
    }

    fn is_ended(&self) -> bool {
        self.ready_state() == ReadyState::Ended
    }

    fn release(&self) {
        let mut playhead = self.shared.playhead.lock();
        playhead.content = None;
        playhead.resumed_at = None;
        playhead.base_position = 0.0;
        drop(playhead);
        self.shared.ready_tx.send_replace(ReadyState::Errored);
    }
}

/// Opens [`SimulatedClip`]s, cycling through a list of playback rates
pub struct SimulatedBackend {
    rates: Vec<f64>,
    load_delay: Duration,
    opened: AtomicUsize,
}

impl SimulatedBackend {
    pub fn new(rates: Vec<f64>) -> Self {
        let rates = if rates.is_empty() { vec![1.0] } else { rates };
        Self {
            rates,
            load_delay: ClipBehavior::default().load_delay,
            opened: AtomicUsize::new(0),
        }
    }

    pub fn with_load_delay(mut self, load_delay: Duration) -> Self {
        self.load_delay = load_delay;
        self
    }
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new(vec![1.0])
    }
}

impl MediaBackend for SimulatedBackend {
    fn open(&self, media: &MediaBuffer) -> MediaResult<Arc<dyn ClipSource>> {
        if media.is_empty() {
            return Err(MediaError::LoadFailed("empty media buffer".to_string()));
        }

        let index = self.opened.fetch_add(1, Ordering::Relaxed);
        let rate = self.rates[index % self.rates.len()];
        let duration = media.len() as f64 / SIMULATED_BYTES_PER_SEC as f64;
        tracing::debug!(
            "Opening simulated clip #{} ({:.2}s, rate {})",
            index,
            duration,
            rate
        );

        Ok(Arc::new(SimulatedClip::new(
            Arc::clone(&media.bytes),
            duration,
            ClipBehavior {
                rate,
                load_delay: self.load_delay,
                ..ClipBehavior::default()
            },
        )))
    }
}

/// Capture channel producing one chunk per second of recording
pub struct SimulatedCapture {
    id: String,
    mime_type: String,
    started_at: Option<Instant>,
    silent: bool,
}

impl SimulatedCapture {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            mime_type: "video/webm".to_string(),
            started_at: None,
            silent: false,
        }
    }

    /// A channel that never produces data
    pub fn silent(id: impl Into<String>) -> Self {
        Self {
            silent: true,
            ..Self::new(id)
        }
    }
}

#[async_trait]
impl CaptureChannel for SimulatedCapture {
    fn id(&self) -> &str {
        &self.id
    }

    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    async fn start(&mut self) -> RecordingResult<()> {
        if self.started_at.is_some() {
            return Err(RecordingError::Capture(format!(
                "{} is already capturing",
                self.id
            )));
        }
        self.started_at = Some(Instant::now());
        Ok(())
    }

    async fn stop(&mut self) -> RecordingResult<Vec<Vec<u8>>> {
        let started_at = self.started_at.take().ok_or(RecordingError::NotRecording)?;
        if self.silent {
            return Ok(Vec::new());
        }

        let total = (started_at.elapsed().as_secs_f64() * SIMULATED_BYTES_PER_SEC as f64) as usize;
        let mut chunks = Vec::new();
        let mut remaining = total;
        while remaining > 0 {
            let len = remaining.min(SIMULATED_BYTES_PER_SEC);
            chunks.push(vec![0x1a; len]);
            remaining -= len;
        }
        Ok(chunks)
    }

    fn is_recording(&self) -> bool {
        self.started_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_load_then_play_advances_with_rate() {
        let clip = SimulatedClip::with_duration(
            10.0,
            ClipBehavior {
                rate: 1.5,
                ..ClipBehavior::default()
            },
        );
        clip.load().await.unwrap();
        assert_eq!(clip.ready_state(), ReadyState::Loading);

        let mut ready = clip.readiness();
        ready.wait_for(|s| s.is_ready()).await.unwrap();

        clip.play().await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!((clip.position() - 3.0).abs() < 1e-6);
        assert!(!clip.is_paused());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clip_ends_at_duration() {
        let clip = SimulatedClip::with_duration(1.0, ClipBehavior::default());
        clip.load().await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        clip.play().await.unwrap();

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(clip.is_ended());
        assert_eq!(clip.position(), 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_fails_further_operations() {
        let clip = SimulatedClip::with_duration(1.0, ClipBehavior::default());
        clip.release();

        assert!(clip.is_released());
        assert_eq!(clip.load().await, Err(MediaError::Released));
        assert_eq!(clip.seek(0.5), Err(MediaError::Released));
        assert_eq!(clip.ready_state(), ReadyState::Errored);
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_chunks_follow_elapsed_time() {
        let mut capture = SimulatedCapture::new("cam");
        capture.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(2500)).await;
        let chunks = capture.stop().await.unwrap();

        assert_eq!(chunks.len(), 3);
        let total: usize = chunks.iter().map(Vec::len).sum();
        assert_eq!(total, SIMULATED_BYTES_PER_SEC * 5 / 2);
        assert!(!capture.is_recording());
    }

    #[test]
    fn test_backend_cycles_rates_and_rejects_empty_media() {
        let backend = SimulatedBackend::new(vec![1.0, 2.0]);
        let media = MediaBuffer::new(vec![0u8; SIMULATED_BYTES_PER_SEC * 2], "video/webm");

        let clip = backend.open(&media).unwrap();
        assert_eq!(clip.duration(), Some(2.0));

        let empty = MediaBuffer::new(Vec::new(), "video/webm");
        assert!(matches!(backend.open(&empty), Err(MediaError::LoadFailed(_))));
    }
}
