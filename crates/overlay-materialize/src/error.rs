//! Materialization errors.

use std::path::PathBuf;

use overlay_registry::RegistryError;
use thiserror::Error;

/// Errors that can occur while materializing snapshots or reconciling a manifest.
#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("snapshot slot {path} holds {count} files, expected at most one")]
    SlotConflict { path: PathBuf, count: usize },

    /// No source has any candidate for the group's logical name. A group
    /// whose only candidate is an unversioned declared artifact fails
    /// earlier with [`RegistryError::NoCandidate`].
    #[error("override group {group} matches no known artifact")]
    NoBaseline { group: PathBuf },

    #[error("cannot derive a filename from location {location}")]
    UnnamedLocation { location: String },

    #[error("unsupported location scheme '{scheme}' for {location}")]
    UnsupportedScheme { scheme: String, location: String },

    #[error("cannot create HTTP client: {0}")]
    HttpClient(reqwest::Error),

    #[error("download of {location} failed: {source}")]
    Http {
        location: String,
        source: reqwest::Error,
    },

    #[error("archive error in {path}: {source}")]
    Archive {
        path: PathBuf,
        source: zip::result::ZipError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for materialization operations.
pub type Result<T> = std::result::Result<T, MaterializeError>;
