// Scripted demo session on the simulated media backend

use anyhow::Context;
use open_chorus_lib::commands::{chorus, export, recording, takes};
use open_chorus_lib::config::ChorusConfig;
use open_chorus_lib::media::{SimulatedBackend, SimulatedCapture};
use open_chorus_lib::playback::{PlaybackEvent, PlaybackState};
use open_chorus_lib::ChorusApp;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

const SINGERS: [&str; 3] = ["Alice", "Bob", "Carol"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    open_chorus_lib::init_tracing();

    let config_path = std::env::var_os("CHORUS_CONFIG").map(PathBuf::from);
    let config = ChorusConfig::load_or_default(config_path.as_deref())
        .context("failed to load configuration")?;

    // Slightly different clock rates so the drift monitor has work to do
    let backend = SimulatedBackend::new(vec![1.0, 1.03, 0.97]);
    let app = ChorusApp::new(
        config,
        Arc::new(backend),
        Box::new(SimulatedCapture::new("simulated-camera")),
        None,
    )?;

    for (i, singer) in SINGERS.iter().enumerate() {
        tracing::info!("{} is up", singer);
        recording::start_take(&app.recorder).await?;
        tokio::time::sleep(Duration::from_millis(1500 + 500 * i as u64)).await;
        let take = recording::stop_take(&app.recorder).await?;
        let saved = takes::save_take(&app.state, &app.recorder, Some(singer.to_string())).await?;
        tracing::info!(
            "Saved '{}' ({:.1}s, {} bytes)",
            saved.name,
            take.duration_ms / 1000.0,
            take.size_bytes
        );
    }

    let layout = takes::grid_layout(&app.state).await;
    tracing::info!("Grid: {} columns x {} rows", layout.columns, layout.rows);

    let mut events = chorus::chorus_events(&app.chorus).await;
    let session = chorus::play_chorus(&app.state, &app.chorus).await?;
    tracing::info!("Chorus session {} started", session);

    let mut corrections = 0;
    loop {
        match events.recv().await {
            Ok(PlaybackEvent::Synced(report)) => corrections += report.corrected.len(),
            Ok(PlaybackEvent::StateChanged(PlaybackState::Stopped)) => break,
            Ok(PlaybackEvent::Fault(message)) => anyhow::bail!("playback fault: {}", message),
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!("Skipped {} playback events", skipped)
            }
            Err(RecvError::Closed) => break,
        }
    }
    tracing::info!("Chorus finished after {} drift corrections", corrections);

    let bundle = export::download_chorus(&app.state, &app.export, PathBuf::from("chorus-export")).await?;
    println!("Exported chorus to {}", bundle.display());

    Ok(())
}
