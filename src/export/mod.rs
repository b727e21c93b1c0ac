//! Chorus export
//!
//! Writes every recorded take, with a manifest, into a bundle directory.

pub mod bundle;
pub mod types;

pub use bundle::{is_valid_bundle, read_manifest, read_meta, write_bundle};
pub use types::{
    BundleMeta, ExportError, ExportOptions, ExportResult, ExportTake, MediaContainer,
    TakeManifestEntry, BUNDLE_FORMAT,
};
