//! Export command handlers

use super::takes::AppState;
use crate::export::{write_bundle, ExportError};
use crate::registry::Clip;
use crate::utils::{AppError, ErrorResponse};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// State for tracking export jobs
#[derive(Default)]
pub struct ExportState {
    /// Whether an export is currently running
    is_exporting: Arc<AtomicBool>,
}

/// Clears the export flag however the export ends
struct ExportGuard(Arc<AtomicBool>);

impl Drop for ExportGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// Write every saved take into a chorus bundle under `parent_dir`
///
/// Returns the bundle directory.
pub async fn download_chorus(
    state: &AppState,
    export: &ExportState,
    parent_dir: PathBuf,
) -> Result<PathBuf, ErrorResponse> {
    if export.is_exporting.swap(true, Ordering::Relaxed) {
        return Err(ErrorResponse {
            code: "EXPORT_ERROR".to_string(),
            message: "An export is already in progress".to_string(),
        });
    }
    let _guard = ExportGuard(Arc::clone(&export.is_exporting));

    let takes: Vec<_> = state
        .registry
        .lock()
        .await
        .iter()
        .map(Clip::export_take)
        .collect();
    if takes.is_empty() {
        return Err(AppError::from(ExportError::NoTakes).into());
    }

    tracing::info!("Exporting {} takes to {:?}", takes.len(), parent_dir);
    let options = state.config.export.clone();

    let result = tokio::task::spawn_blocking(move || write_bundle(&takes, &parent_dir, &options))
        .await
        .map_err(|e| AppError::Io(io::Error::new(io::ErrorKind::Other, e.to_string())))?;

    match result {
        Ok(path) => {
            tracing::info!("Export completed successfully");
            Ok(path)
        }
        Err(e) => {
            tracing::error!("Export failed: {}", e);
            Err(AppError::from(e).into())
        }
    }
}

/// Check if an export is currently running
pub fn is_exporting(export: &ExportState) -> bool {
    export.is_exporting.load(Ordering::Relaxed)
}
