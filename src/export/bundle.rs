//! Chorus bundle read/write operations
//!
//! A bundle is a plain directory, not a compressed archive, containing:
//! - meta.json: Version and metadata
//! - takes.json: Manifest of the exported takes
//! - one media file per take

use super::types::{
    BundleMeta, ExportError, ExportOptions, ExportResult, ExportTake, MediaContainer,
    TakeManifestEntry, BUNDLE_FORMAT,
};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

const META_FILE: &str = "meta.json";
const MANIFEST_FILE: &str = "takes.json";

/// Write every take into `<parent>/<bundle_name>/`.
///
/// An existing chorus bundle at that path is replaced; any other existing
/// directory is left alone and reported as [`ExportError::InvalidBundle`].
pub fn write_bundle(
    takes: &[ExportTake],
    parent: &Path,
    options: &ExportOptions,
) -> ExportResult<PathBuf> {
    if takes.is_empty() {
        return Err(ExportError::NoTakes);
    }

    let bundle_name = sanitize_stem(&options.bundle_name).unwrap_or_else(|| "chorus".to_string());
    let bundle_path = parent.join(bundle_name);

    if bundle_path.exists() {
        if !is_valid_bundle(&bundle_path) {
            return Err(ExportError::InvalidBundle(format!(
                "{} already exists and is not a chorus bundle",
                bundle_path.display()
            )));
        }
        tracing::debug!("Replacing existing bundle at {:?}", bundle_path);
        fs::remove_dir_all(&bundle_path)?;
    }
    fs::create_dir_all(&bundle_path)?;

    let mut used = HashSet::new();
    let mut manifest = Vec::with_capacity(takes.len());

    for (index, take) in takes.iter().enumerate() {
        let stem = sanitize_stem(&take.name).unwrap_or_else(|| format!("recording-{}", index + 1));
        let extension = MediaContainer::from_mime(&take.mime_type)
            .map(|c| c.extension())
            .unwrap_or(options.default_extension.as_str());
        let file = unique_file_name(&stem, extension, &mut used);

        fs::write(bundle_path.join(&file), &take.bytes)?;
        tracing::debug!("Wrote take '{}' as {} ({} bytes)", take.name, file, take.bytes.len());

        manifest.push(TakeManifestEntry {
            name: take.name.clone(),
            file,
            mime_type: take.mime_type.clone(),
            duration_secs: take.duration_secs,
            size_bytes: take.bytes.len(),
        });
    }

    fs::write(
        bundle_path.join(MANIFEST_FILE),
        serde_json::to_string_pretty(&manifest)?,
    )?;
    fs::write(
        bundle_path.join(META_FILE),
        serde_json::to_string_pretty(&BundleMeta::new(takes.len()))?,
    )?;

    tracing::info!("Exported {} takes to {:?}", takes.len(), bundle_path);
    Ok(bundle_path)
}

/// Read bundle metadata
pub fn read_meta(bundle_path: &Path) -> ExportResult<BundleMeta> {
    let meta_path = bundle_path.join(META_FILE);
    if !meta_path.exists() {
        return Err(ExportError::InvalidBundle(format!("missing {}", META_FILE)));
    }

    let meta: BundleMeta = serde_json::from_str(&fs::read_to_string(&meta_path)?)?;
    Ok(meta)
}

/// Read the take manifest of a bundle
pub fn read_manifest(bundle_path: &Path) -> ExportResult<Vec<TakeManifestEntry>> {
    let manifest_path = bundle_path.join(MANIFEST_FILE);
    if !manifest_path.exists() {
        return Err(ExportError::InvalidBundle(format!("missing {}", MANIFEST_FILE)));
    }

    let manifest: Vec<TakeManifestEntry> =
        serde_json::from_str(&fs::read_to_string(&manifest_path)?)?;
    Ok(manifest)
}

/// Check if a path is a chorus bundle
pub fn is_valid_bundle(path: &Path) -> bool {
    if !path.is_dir() {
        return false;
    }

    matches!(read_meta(path), Ok(meta) if meta.format == BUNDLE_FORMAT)
        && path.join(MANIFEST_FILE).exists()
}

/// File-system safe version of a take name, or `None` if nothing usable remains
fn sanitize_stem(name: &str) -> Option<String> {
    let mut stem = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_alphanumeric() {
            stem.push(c);
        } else if (c.is_whitespace() || c == '-' || c == '_') && !stem.ends_with('-') {
            stem.push('-');
        }
    }

    let stem = stem.trim_matches('-');
    (!stem.is_empty()).then(|| stem.to_string())
}

/// `stem.ext`, or `stem-2.ext`, `stem-3.ext`... if already taken
fn unique_file_name(stem: &str, extension: &str, used: &mut HashSet<String>) -> String {
    let mut candidate = format!("{}.{}", stem, extension);
    let mut suffix = 2;
    // Compare case-insensitively so names stay distinct on any file system
    while !used.insert(candidate.to_lowercase()) {
        candidate = format!("{}-{}.{}", stem, suffix, extension);
        suffix += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn take(name: &str, mime_type: &str, bytes: &[u8]) -> ExportTake {
        ExportTake {
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            duration_secs: Some(1.5),
            bytes: Arc::from(bytes),
        }
    }

    #[test]
    fn test_write_and_read_bundle() {
        let dir = tempdir().unwrap();
        let takes = vec![
            take("Alice", "video/webm", b"alice"),
            take("Alice", "video/webm", b"alice again"),
            take("Bob / Uncle", "video/mp4", b"bob"),
            take("???", "application/x-unknown", b"mystery"),
        ];

        let path = write_bundle(&takes, dir.path(), &ExportOptions::default()).unwrap();

        assert_eq!(path, dir.path().join("birthday-chorus"));
        assert!(is_valid_bundle(&path));

        let manifest = read_manifest(&path).unwrap();
        let files: Vec<&str> = manifest.iter().map(|e| e.file.as_str()).collect();
        assert_eq!(
            files,
            vec!["Alice.webm", "Alice-2.webm", "Bob-Uncle.mp4", "recording-4.webm"]
        );
        assert_eq!(fs::read(path.join("Alice-2.webm")).unwrap(), b"alice again");
        assert_eq!(manifest[2].size_bytes, 3);
        assert_eq!(manifest[0].duration_secs, Some(1.5));

        let meta = read_meta(&path).unwrap();
        assert_eq!(meta.format, BUNDLE_FORMAT);
        assert_eq!(meta.take_count, 4);
    }

    #[test]
    fn test_zero_takes_is_rejected() {
        let dir = tempdir().unwrap();
        let result = write_bundle(&[], dir.path(), &ExportOptions::default());

        assert!(matches!(result, Err(ExportError::NoTakes)));
        assert!(!dir.path().join("birthday-chorus").exists());
    }

    #[test]
    fn test_existing_bundle_is_replaced() {
        let dir = tempdir().unwrap();
        let options = ExportOptions::default();

        write_bundle(&[take("Old", "video/webm", b"old")], dir.path(), &options).unwrap();
        let path = write_bundle(&[take("New", "video/webm", b"new")], dir.path(), &options).unwrap();

        assert!(!path.join("Old.webm").exists());
        assert!(path.join("New.webm").exists());
        assert_eq!(read_meta(&path).unwrap().take_count, 1);
    }

    #[test]
    fn test_foreign_directory_is_not_overwritten() {
        let dir = tempdir().unwrap();
        let foreign = dir.path().join("birthday-chorus");
        fs::create_dir_all(&foreign).unwrap();
        fs::write(foreign.join("notes.txt"), "keep me").unwrap();

        let result = write_bundle(
            &[take("Alice", "video/webm", b"a")],
            dir.path(),
            &ExportOptions::default(),
        );

        assert!(matches!(result, Err(ExportError::InvalidBundle(_))));
        assert!(foreign.join("notes.txt").exists());
        assert!(!is_valid_bundle(&foreign));
    }

    #[test]
    fn test_sanitize_stem() {
        assert_eq!(sanitize_stem("Recording 1"), Some("Recording-1".to_string()));
        assert_eq!(sanitize_stem("  a -- b__c "), Some("a-b-c".to_string()));
        assert_eq!(sanitize_stem("../../etc"), Some("etc".to_string()));
        assert_eq!(sanitize_stem("***"), None);
    }

    #[test]
    fn test_bundle_name_names_plain_directory() {
        let dir = tempdir().unwrap();
        let options = ExportOptions {
            bundle_name: "Party Night".to_string(),
            ..ExportOptions::default()
        };

        let takes = [take("Alice", "video/webm", b"alice")];
        let path = write_bundle(&takes, dir.path(), &options).unwrap();

        assert_eq!(path, dir.path().join("Party-Night"));
        assert!(path.is_dir());
        assert!(path.join("Alice.webm").is_file());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
