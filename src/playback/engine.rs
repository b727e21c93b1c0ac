//! Chorus engine
//!
//! Starts every clip of a snapshot together behind a readiness barrier,
//! then keeps them aligned with the drift monitor until they all finish or
//! the session is stopped.

use super::barrier;
use super::error::{PlaybackError, PlaybackResult};
use super::monitor::{halt_members, spawn_monitor, transition, MonitorContext, MonitorHandle};
use super::state::{PlaybackConfig, PlaybackEvent, PlaybackSession, PlaybackState, SessionMember};
use futures::future::try_join_all;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Owns at most one playback session at a time
pub struct ChorusEngine {
    config: PlaybackConfig,

    /// Shared with the monitor task, which ends sessions on its own
    state: Arc<RwLock<PlaybackState>>,

    session: Option<PlaybackSession>,

    /// Clip ids of the starting or playing session
    member_ids: Arc<RwLock<Vec<Uuid>>>,

    monitor: Option<MonitorHandle>,

    /// Number of live monitor tasks
    active_monitors: Arc<AtomicUsize>,

    event_tx: broadcast::Sender<PlaybackEvent>,
}

impl ChorusEngine {
    pub fn new(config: PlaybackConfig) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            config,
            state: Arc::new(RwLock::new(PlaybackState::Idle)),
            session: None,
            member_ids: Arc::new(RwLock::new(Vec::new())),
            monitor: None,
            active_monitors: Arc::new(AtomicUsize::new(0)),
            event_tx,
        }
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    pub fn state(&self) -> PlaybackState {
        *self.state.read()
    }

    /// Shared view of the state, readable while `start` holds the engine
    pub fn state_handle(&self) -> Arc<RwLock<PlaybackState>> {
        Arc::clone(&self.state)
    }

    /// Shared view of the session's clip ids, readable while `start` holds
    /// the engine
    pub fn member_handle(&self) -> Arc<RwLock<Vec<Uuid>>> {
        Arc::clone(&self.member_ids)
    }

    /// Subscribe to playback events
    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.event_tx.subscribe()
    }

    /// The current or most recently finished session
    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    pub fn active_monitors(&self) -> usize {
        self.active_monitors.load(Ordering::SeqCst)
    }

    /// Whether `clip_id` belongs to a session that is starting or playing
    pub fn is_member(&self, clip_id: Uuid) -> bool {
        let live = matches!(
            self.state(),
            PlaybackState::AwaitingReady | PlaybackState::Playing
        );
        live && self.member_ids.read().contains(&clip_id)
    }

    /// Start a chorus session over `members`.
    ///
    /// Any running session is stopped first. Nothing plays until every
    /// member is ready; one failing member fails the whole attempt.
    pub async fn start(&mut self, members: Vec<SessionMember>) -> PlaybackResult<Uuid> {
        self.start_with_cancel(members, &CancellationToken::new()).await
    }

    /// [`start`](Self::start), abandoned with [`PlaybackError::Readiness`]
    /// if `cancel` fires while members are still getting ready.
    pub async fn start_with_cancel(
        &mut self,
        members: Vec<SessionMember>,
        cancel: &CancellationToken,
    ) -> PlaybackResult<Uuid> {
        if members.is_empty() {
            tracing::warn!("Chorus start requested with no clips");
            return Err(PlaybackError::EmptyInput);
        }

        self.stop().await;

        let session = PlaybackSession::new(members);
        let session_id = session.id;
        tracing::info!(
            "Starting chorus session {} with {} clips",
            session_id,
            session.members.len()
        );
        *self.member_ids.write() = session.members.iter().map(|m| m.clip_id).collect();
        self.transition(PlaybackState::AwaitingReady);

        for member in &session.members {
            member.source.set_muted(false);
            member.source.set_dimmed(false);
            if let Err(e) = member.source.seek(0.0) {
                tracing::debug!("Could not rewind '{}' before reload: {}", member.name, e);
            }
            if let Err(e) = member.source.load().await {
                let error = PlaybackError::Readiness {
                    clip: member.name.clone(),
                    reason: e.to_string(),
                };
                return Err(self.abort_readiness(&session.members, error));
            }
        }

        let members = session.members.clone();
        self.session = Some(session);

        if let Err(e) = barrier::await_ready(&members, self.config.ready_timeout(), cancel).await {
            self.session = None;
            return Err(self.abort_readiness(&members, e));
        }

        // Issue every play call back-to-back, then wait for all of them
        let plays = members.iter().map(|member| async move {
            member
                .source
                .play()
                .await
                .map_err(|e| PlaybackError::PlaybackStart {
                    clip: member.name.clone(),
                    reason: e.to_string(),
                })
        });
        if let Err(e) = try_join_all(plays).await {
            tracing::error!("Chorus start failed: {}", e);
            halt_members(&members);
            self.member_ids.write().clear();
            self.transition(PlaybackState::Stopped);
            return Err(e);
        }

        self.transition(PlaybackState::Playing);
        self.monitor = Some(spawn_monitor(MonitorContext {
            members,
            threshold_secs: self.config.drift_threshold_secs,
            refresh_interval: self.config.refresh_interval(),
            state: Arc::clone(&self.state),
            event_tx: self.event_tx.clone(),
            active: Arc::clone(&self.active_monitors),
        }));

        tracing::info!("Chorus session {} playing", session_id);
        Ok(session_id)
    }

    /// Stop the current session.
    ///
    /// Cancels the monitor, then pauses, rewinds, mutes and dims every
    /// member. Calling it again, or with no session, changes nothing.
    pub async fn stop(&mut self) {
        if let Some(monitor) = self.monitor.take() {
            monitor.shutdown().await;
        }

        let Some(session) = self.session.take() else {
            return;
        };

        tracing::info!("Stopping chorus session {}", session.id);
        halt_members(&session.members);
        self.member_ids.write().clear();
        self.transition(PlaybackState::Stopped);
    }

    fn abort_readiness(&mut self, members: &[SessionMember], error: PlaybackError) -> PlaybackError {
        tracing::error!("Chorus start aborted: {}", error);
        halt_members(members);
        self.member_ids.write().clear();
        self.transition(PlaybackState::Idle);
        error
    }

    fn transition(&self, next: PlaybackState) {
        transition(&self.state, &self.event_tx, next);
    }
}

impl Default for ChorusEngine {
    fn default() -> Self {
        Self::new(PlaybackConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{ClipBehavior, ClipSource, SimulatedClip};
    use std::time::Duration;
    use tokio::sync::broadcast::error::RecvError;

    fn clip(behavior: ClipBehavior) -> Arc<SimulatedClip> {
        Arc::new(SimulatedClip::with_duration(5.0, behavior))
    }

    fn members_of(clips: &[Arc<SimulatedClip>]) -> Vec<SessionMember> {
        clips
            .iter()
            .enumerate()
            .map(|(i, clip)| SessionMember {
                clip_id: Uuid::new_v4(),
                name: format!("Recording {}", i + 1),
                source: clip.clone(),
            })
            .collect()
    }

    async fn wait_for_state(
        events: &mut broadcast::Receiver<PlaybackEvent>,
        wanted: PlaybackState,
    ) {
        tokio::time::timeout(Duration::from_secs(60), async {
            loop {
                match events.recv().await {
                    Ok(PlaybackEvent::StateChanged(state)) if state == wanted => return,
                    Err(RecvError::Closed) => panic!("event channel closed"),
                    _ => {}
                }
            }
        })
        .await
        .expect("state not reached");
    }

    fn assert_halted(clips: &[Arc<SimulatedClip>]) {
        for clip in clips {
            assert!(clip.is_paused());
            assert_eq!(clip.position(), 0.0);
            assert!(clip.is_muted());
            assert!(clip.is_dimmed());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_plays_each_member_once() {
        let clips = vec![
            clip(ClipBehavior::default()),
            clip(ClipBehavior {
                load_delay: Duration::from_millis(400),
                ..ClipBehavior::default()
            }),
            clip(ClipBehavior::default()),
        ];
        let mut engine = ChorusEngine::default();
        let mut events = engine.subscribe();

        engine.start(members_of(&clips)).await.unwrap();

        assert_eq!(engine.state(), PlaybackState::Playing);
        assert!(matches!(
            events.recv().await,
            Ok(PlaybackEvent::StateChanged(PlaybackState::AwaitingReady))
        ));
        assert!(matches!(
            events.recv().await,
            Ok(PlaybackEvent::StateChanged(PlaybackState::Playing))
        ));
        for clip in &clips {
            assert_eq!(clip.play_calls(), 1);
            assert!(!clip.is_muted());
        }
        assert_eq!(engine.active_monitors(), 1);

        engine.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_start_is_rejected() {
        let mut engine = ChorusEngine::default();
        let mut events = engine.subscribe();

        assert_eq!(engine.start(Vec::new()).await, Err(PlaybackError::EmptyInput));
        assert_eq!(engine.state(), PlaybackState::Idle);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_readiness_error_plays_nothing() {
        let clips = vec![
            clip(ClipBehavior::default()),
            clip(ClipBehavior {
                fail_load: true,
                load_delay: Duration::from_millis(200),
                ..ClipBehavior::default()
            }),
            clip(ClipBehavior::default()),
        ];
        let mut engine = ChorusEngine::default();

        let result = engine.start(members_of(&clips)).await;

        assert!(matches!(result, Err(PlaybackError::Readiness { ref clip, .. }) if clip == "Recording 2"));
        assert_eq!(engine.state(), PlaybackState::Idle);
        assert!(clips.iter().all(|c| c.play_calls() == 0));
        assert_eq!(engine.active_monitors(), 0);
        assert!(engine.session().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_member_times_out() {
        let clips = vec![
            clip(ClipBehavior::default()),
            clip(ClipBehavior {
                stall: true,
                ..ClipBehavior::default()
            }),
        ];
        let mut engine = ChorusEngine::new(PlaybackConfig {
            ready_timeout_ms: Some(3_000),
            ..PlaybackConfig::default()
        });

        let start = tokio::time::Instant::now();
        let result = engine.start(members_of(&clips)).await;

        assert!(matches!(result, Err(PlaybackError::Readiness { .. })));
        assert!(start.elapsed() >= Duration::from_secs(3));
        assert_eq!(engine.state(), PlaybackState::Idle);
        assert!(clips.iter().all(|c| c.play_calls() == 0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_start_returns_to_idle() {
        let clips = vec![
            clip(ClipBehavior::default()),
            clip(ClipBehavior {
                stall: true,
                ..ClipBehavior::default()
            }),
        ];
        let members = members_of(&clips);
        let stalled_id = members[1].clip_id;
        let mut engine = ChorusEngine::new(PlaybackConfig {
            ready_timeout_ms: None,
            ..PlaybackConfig::default()
        });
        let members_view = engine.member_handle();

        let token = CancellationToken::new();
        let canceller = token.clone();
        let watcher = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            let listed = members_view.read().contains(&stalled_id);
            canceller.cancel();
            listed
        });

        let result = engine.start_with_cancel(members, &token).await;

        assert!(watcher.await.unwrap());

        assert!(matches!(
            result,
            Err(PlaybackError::Readiness { ref reason, .. }) if reason == "start cancelled"
        ));
        assert_eq!(engine.state(), PlaybackState::Idle);
        assert!(!engine.is_member(stalled_id));
        assert!(clips.iter().all(|c| c.play_calls() == 0));
        assert_eq!(engine.active_monitors(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_play_stops_session() {
        let clips = vec![
            clip(ClipBehavior::default()),
            clip(ClipBehavior {
                fail_play: true,
                ..ClipBehavior::default()
            }),
        ];
        let mut engine = ChorusEngine::default();

        let result = engine.start(members_of(&clips)).await;

        assert!(matches!(result, Err(PlaybackError::PlaybackStart { .. })));
        assert_eq!(engine.state(), PlaybackState::Stopped);
        assert_eq!(engine.active_monitors(), 0);
        assert_halted(&clips);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent() {
        let clips = vec![clip(ClipBehavior::default()), clip(ClipBehavior::default())];
        let mut engine = ChorusEngine::default();
        engine.start(members_of(&clips)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;

        engine.stop().await;
        assert_eq!(engine.state(), PlaybackState::Stopped);
        assert_halted(&clips);

        engine.stop().await;
        assert_eq!(engine.state(), PlaybackState::Stopped);
        assert_halted(&clips);
        assert_eq!(engine.active_monitors(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_leaves_single_monitor() {
        let clips = vec![clip(ClipBehavior::default()), clip(ClipBehavior::default())];
        let mut engine = ChorusEngine::default();

        let first = engine.start(members_of(&clips)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        let second = engine.start(members_of(&clips)).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(engine.active_monitors(), 1);
        assert_eq!(engine.state(), PlaybackState::Playing);
        assert!(clips.iter().all(|c| c.play_calls() == 2));

        engine.stop().await;
        assert_eq!(engine.active_monitors(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drifting_clips_are_pulled_together_until_end() {
        let clips = vec![
            Arc::new(SimulatedClip::with_duration(2.0, ClipBehavior::default())),
            Arc::new(SimulatedClip::with_duration(
                2.0,
                ClipBehavior {
                    rate: 1.5,
                    ..ClipBehavior::default()
                },
            )),
        ];
        let mut engine = ChorusEngine::default();
        let mut events = engine.subscribe();

        engine.start(members_of(&clips)).await.unwrap();
        wait_for_state(&mut events, PlaybackState::Stopped).await;

        // Anything other than a rewind to zero is a drift correction
        let corrections: usize = clips
            .iter()
            .map(|c| c.seeks().iter().filter(|&&s| s > 0.0).count())
            .sum();
        assert!(corrections > 0);
        assert_eq!(engine.state(), PlaybackState::Stopped);
        assert_halted(&clips);

        // Wait for the monitor task to finish exiting
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(engine.active_monitors(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_refresh_interval_keeps_monitor_alive() {
        let clips = vec![clip(ClipBehavior::default()), clip(ClipBehavior::default())];
        let mut engine = ChorusEngine::new(PlaybackConfig {
            refresh_interval_ms: 0,
            ..PlaybackConfig::default()
        });
        let mut events = engine.subscribe();

        engine.start(members_of(&clips)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(engine.active_monitors(), 1);
        assert_eq!(engine.state(), PlaybackState::Playing);
        let mut synced = false;
        while let Ok(event) = events.try_recv() {
            assert!(!matches!(event, PlaybackEvent::Fault(_)));
            synced |= matches!(event, PlaybackEvent::Synced(_));
        }
        assert!(synced);

        engine.stop().await;
        assert_eq!(engine.active_monitors(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_membership_follows_session() {
        let clips = vec![clip(ClipBehavior::default())];
        let members = members_of(&clips);
        let id = members[0].clip_id;
        let mut engine = ChorusEngine::default();

        assert!(!engine.is_member(id));
        engine.start(members).await.unwrap();
        assert!(engine.is_member(id));
        assert!(!engine.is_member(Uuid::new_v4()));

        engine.stop().await;
        assert!(!engine.is_member(id));
    }
}
