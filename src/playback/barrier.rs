//! Readiness barrier
//!
//! No member may begin playback until every member has buffered enough to
//! play through. A single failing member fails the whole barrier.

use super::error::{PlaybackError, PlaybackResult};
use super::state::SessionMember;
use crate::media::ReadyState;
use futures::future::try_join_all;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Wait until all members are ready.
///
/// Fails with [`PlaybackError::Readiness`] as soon as one member errors,
/// when `timeout` elapses with a member still loading, or when `cancel`
/// fires.
pub async fn await_ready(
    members: &[SessionMember],
    timeout: Option<Duration>,
    cancel: &CancellationToken,
) -> PlaybackResult<()> {
    let waiting = async {
        let all_ready = try_join_all(members.iter().map(wait_for_member));
        match timeout {
            Some(limit) => match tokio::time::timeout(limit, all_ready).await {
                Ok(result) => result,
                Err(_) => Err(not_ready(
                    members,
                    format!("not ready after {}ms", limit.as_millis()),
                )),
            },
            None => all_ready.await,
        }
    };

    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(not_ready(members, "start cancelled".to_string())),
        result = waiting => result,
    };

    result?;
    tracing::debug!("All {} members ready", members.len());
    Ok(())
}

/// Readiness error naming the first member still loading
fn not_ready(members: &[SessionMember], reason: String) -> PlaybackError {
    let stalled = members
        .iter()
        .find(|m| !m.source.ready_state().is_ready())
        .map(|m| m.name.clone())
        .unwrap_or_default();
    PlaybackError::Readiness {
        clip: stalled,
        reason,
    }
}

async fn wait_for_member(member: &SessionMember) -> PlaybackResult<()> {
    let mut readiness = member.source.readiness();

    let settled = readiness
        .wait_for(|state| state.is_settled())
        .await
        .map(|state| *state);
    let state = match settled {
        Ok(state) => state,
        Err(_) => {
            return Err(PlaybackError::Readiness {
                clip: member.name.clone(),
                reason: "media source closed".to_string(),
            })
        }
    };

    if state == ReadyState::Errored {
        tracing::warn!("Clip '{}' failed to load", member.name);
        return Err(PlaybackError::Readiness {
            clip: member.name.clone(),
            reason: "failed to load".to_string(),
        });
    }

    tracing::debug!("Clip '{}' ready", member.name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{ClipBehavior, ClipSource, SimulatedClip};
    use std::sync::Arc;
    use uuid::Uuid;

    fn member(name: &str, behavior: ClipBehavior) -> SessionMember {
        SessionMember {
            clip_id: Uuid::new_v4(),
            name: name.to_string(),
            source: Arc::new(SimulatedClip::with_duration(3.0, behavior)),
        }
    }

    async fn load_all(members: &[SessionMember]) {
        for m in members {
            m.source.load().await.unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_slowest_member() {
        let members = vec![
            member("fast", ClipBehavior::default()),
            member(
                "slow",
                ClipBehavior {
                    load_delay: Duration::from_secs(2),
                    ..ClipBehavior::default()
                },
            ),
        ];
        load_all(&members).await;

        let start = tokio::time::Instant::now();
        await_ready(&members, None, &CancellationToken::new()).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(2));
        assert!(members.iter().all(|m| m.source.ready_state().is_ready()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_error_fails_barrier() {
        let members = vec![
            member("good", ClipBehavior::default()),
            member(
                "broken",
                ClipBehavior {
                    fail_load: true,
                    ..ClipBehavior::default()
                },
            ),
        ];
        load_all(&members).await;

        let err = await_ready(&members, None, &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, PlaybackError::Readiness { ref clip, .. } if clip == "broken"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_names_stalled_member() {
        let members = vec![
            member("good", ClipBehavior::default()),
            member(
                "stalled",
                ClipBehavior {
                    stall: true,
                    ..ClipBehavior::default()
                },
            ),
        ];
        load_all(&members).await;

        let err = await_ready(&members, Some(Duration::from_secs(5)), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            PlaybackError::Readiness {
                clip: "stalled".to_string(),
                reason: "not ready after 5000ms".to_string(),
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_releases_stalled_wait() {
        let members = vec![
            member("good", ClipBehavior::default()),
            member(
                "stalled",
                ClipBehavior {
                    stall: true,
                    ..ClipBehavior::default()
                },
            ),
        ];
        load_all(&members).await;

        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            canceller.cancel();
        });

        let start = tokio::time::Instant::now();
        let err = await_ready(&members, None, &token).await.unwrap_err();

        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(
            err,
            PlaybackError::Readiness {
                clip: "stalled".to_string(),
                reason: "start cancelled".to_string(),
            }
        );
    }
}
