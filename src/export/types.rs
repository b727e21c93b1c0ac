//! Export types and configuration
//!
//! Types for writing the recorded takes out as a chorus bundle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Bundle format identifier written to `meta.json`
pub const BUNDLE_FORMAT: &str = "chorus-v1";

/// Export configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportOptions {
    /// Directory name of the bundle inside the chosen parent directory.
    /// The export is a plain directory, not a zip archive.
    pub bundle_name: String,
    /// Extension used when a take's MIME type is not recognised
    pub default_extension: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            bundle_name: "birthday-chorus".to_string(),
            default_extension: "webm".to_string(),
        }
    }
}

/// Container formats a take may be stored in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaContainer {
    Webm,
    Mp4,
    Ogg,
}

impl MediaContainer {
    /// Recognise a container from a MIME type such as `video/webm;codecs=vp9`
    pub fn from_mime(mime_type: &str) -> Option<Self> {
        let essence = mime_type.split(';').next().unwrap_or_default().trim();
        let subtype = essence.rsplit('/').next().unwrap_or_default();
        match subtype.to_ascii_lowercase().as_str() {
            "webm" => Some(Self::Webm),
            "mp4" => Some(Self::Mp4),
            "ogg" => Some(Self::Ogg),
            _ => None,
        }
    }

    /// Get the file extension for this container
    pub fn extension(&self) -> &'static str {
        match self {
            MediaContainer::Webm => "webm",
            MediaContainer::Mp4 => "mp4",
            MediaContainer::Ogg => "ogg",
        }
    }
}

/// One take handed to the exporter
#[derive(Debug, Clone)]
pub struct ExportTake {
    pub name: String,
    pub mime_type: String,
    pub duration_secs: Option<f64>,
    pub bytes: Arc<[u8]>,
}

/// Bundle metadata (`meta.json`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleMeta {
    pub version: String,
    pub format: String,
    pub created_at: DateTime<Utc>,
    pub take_count: usize,
}

impl BundleMeta {
    pub fn new(take_count: usize) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            format: BUNDLE_FORMAT.to_string(),
            created_at: Utc::now(),
            take_count,
        }
    }
}

/// One entry of the take manifest (`takes.json`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TakeManifestEntry {
    pub name: String,
    /// File name relative to the bundle directory
    pub file: String,
    pub mime_type: String,
    pub duration_secs: Option<f64>,
    pub size_bytes: usize,
}

/// Export errors
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("No recordings to export")]
    NoTakes,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid bundle: {0}")]
    InvalidBundle(String),
}

pub type ExportResult<T> = Result<T, ExportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_from_mime() {
        assert_eq!(MediaContainer::from_mime("video/webm"), Some(MediaContainer::Webm));
        assert_eq!(
            MediaContainer::from_mime("video/webm;codecs=vp8,opus"),
            Some(MediaContainer::Webm)
        );
        assert_eq!(MediaContainer::from_mime("video/MP4"), Some(MediaContainer::Mp4));
        assert_eq!(MediaContainer::from_mime("application/octet-stream"), None);
        assert_eq!(MediaContainer::from_mime(""), None);
    }
}
