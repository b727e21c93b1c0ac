//! Drift monitor
//!
//! Once per refresh tick the monitor averages the positions of every
//! playing member and snaps any member further than the threshold from
//! that mean back onto it. There is no master clip: correction is
//! symmetric, so one stuck member never drags the rest.

use super::error::PlaybackError;
use super::state::{PlaybackEvent, PlaybackState, SessionMember, SyncReport};
use crate::media::ReadyState;
use parking_lot::RwLock;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Result of a single synchronization tick
#[derive(Debug)]
pub enum TickOutcome {
    /// No member is playing any more
    Finished,
    /// Drift was measured and corrected; failed seeks are reported, not fatal
    Synced {
        report: SyncReport,
        failures: Vec<PlaybackError>,
    },
}

/// Run one synchronization pass over `members`.
pub fn sync_tick(members: &[SessionMember], threshold_secs: f64) -> Result<TickOutcome, PlaybackError> {
    let playing: Vec<(&SessionMember, f64)> = members
        .iter()
        .filter(|m| {
            m.source.ready_state() == ReadyState::Playing
                && !m.source.is_paused()
                && !m.source.is_ended()
        })
        .map(|m| (m, m.source.position()))
        .collect();

    if playing.is_empty() {
        return Ok(TickOutcome::Finished);
    }

    if let Some((member, position)) = playing.iter().find(|(_, p)| !p.is_finite()) {
        return Err(PlaybackError::MonitorFault(format!(
            "'{}' reported position {}",
            member.name, position
        )));
    }

    let reference_time = playing.iter().map(|(_, p)| p).sum::<f64>() / playing.len() as f64;

    let mut corrected = Vec::new();
    let mut failures = Vec::new();
    let mut max_drift = 0.0_f64;

    for (member, position) in &playing {
        let drift = (position - reference_time).abs();
        max_drift = max_drift.max(drift);
        if drift <= threshold_secs {
            continue;
        }

        match member.source.seek(reference_time) {
            Ok(()) => corrected.push(member.clip_id),
            Err(e) => failures.push(PlaybackError::Correction {
                clip: member.name.clone(),
                reason: e.to_string(),
            }),
        }
    }

    Ok(TickOutcome::Synced {
        report: SyncReport {
            playing: playing.len(),
            reference_time,
            max_drift,
            corrected,
        },
        failures,
    })
}

/// Pause, rewind, mute and dim every member
pub(crate) fn halt_members(members: &[SessionMember]) {
    for member in members {
        member.source.pause();
        if let Err(e) = member.source.seek(0.0) {
            tracing::warn!("Failed to rewind '{}': {}", member.name, e);
        }
        member.source.set_muted(true);
        member.source.set_dimmed(true);
    }
}

pub(crate) fn transition(
    state: &RwLock<PlaybackState>,
    event_tx: &broadcast::Sender<PlaybackEvent>,
    next: PlaybackState,
) {
    let previous = std::mem::replace(&mut *state.write(), next);
    if previous != next {
        tracing::debug!("Playback state {:?} -> {:?}", previous, next);
        let _ = event_tx.send(PlaybackEvent::StateChanged(next));
    }
}

/// Shared pieces a monitor task needs
pub(crate) struct MonitorContext {
    pub members: Vec<SessionMember>,
    pub threshold_secs: f64,
    pub refresh_interval: Duration,
    pub state: Arc<RwLock<PlaybackState>>,
    pub event_tx: broadcast::Sender<PlaybackEvent>,
    pub active: Arc<AtomicUsize>,
}

/// Handle to a running monitor task
pub(crate) struct MonitorHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    /// Cancel the monitor and wait for its task to exit
    pub async fn shutdown(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    tracing::warn!("Monitor task ended abnormally: {}", e);
                }
            }
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Keeps the live-monitor count accurate even if the task is dropped
/// before it first runs.
struct ActiveGuard(Arc<AtomicUsize>);

impl ActiveGuard {
    fn new(active: Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::SeqCst);
        Self(active)
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub(crate) fn spawn_monitor(ctx: MonitorContext) -> MonitorHandle {
    let token = CancellationToken::new();
    let cancelled = token.clone();
    let guard = ActiveGuard::new(Arc::clone(&ctx.active));

    let task = tokio::spawn(async move {
        let _guard = guard;
        run_monitor(ctx, cancelled).await;
    });

    MonitorHandle {
        token,
        task: Some(task),
    }
}

async fn run_monitor(ctx: MonitorContext, cancelled: CancellationToken) {
    let mut ticker = tokio::time::interval(ctx.refresh_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tracing::debug!("Monitor started for {} members", ctx.members.len());

    loop {
        tokio::select! {
            biased;
            _ = cancelled.cancelled() => {
                tracing::debug!("Monitor cancelled");
                return;
            }
            _ = ticker.tick() => {}
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            sync_tick(&ctx.members, ctx.threshold_secs)
        }))
        .unwrap_or_else(|payload| Err(PlaybackError::MonitorFault(panic_message(payload))));

        match outcome {
            Ok(TickOutcome::Finished) => {
                tracing::info!("All clips finished, stopping chorus");
                halt_members(&ctx.members);
                transition(&ctx.state, &ctx.event_tx, PlaybackState::Stopped);
                return;
            }
            Ok(TickOutcome::Synced { report, failures }) => {
                for failure in failures {
                    tracing::warn!("{}", failure);
                    if let PlaybackError::Correction { clip, reason } = failure {
                        let _ = ctx.event_tx.send(PlaybackEvent::CorrectionFailed {
                            clip,
                            message: reason,
                        });
                    }
                }
                if !report.corrected.is_empty() {
                    tracing::debug!(
                        "Corrected {} of {} clips to {:.3}s (max drift {:.3}s)",
                        report.corrected.len(),
                        report.playing,
                        report.reference_time,
                        report.max_drift
                    );
                }
                let _ = ctx.event_tx.send(PlaybackEvent::Synced(report));
            }
            Err(fault) => {
                tracing::error!("{}, force-stopping chorus", fault);
                halt_members(&ctx.members);
                transition(&ctx.state, &ctx.event_tx, PlaybackState::Stopped);
                let _ = ctx.event_tx.send(PlaybackEvent::Fault(fault.to_string()));
                return;
            }
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic during monitor tick".to_string()
    }
}
