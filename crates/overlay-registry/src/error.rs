//! Registry error types.

use std::path::PathBuf;

/// Errors that can occur while building registries or resolving artifacts.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A version component is not a valid integer.
    #[error("invalid version '{version}' in '{name}': component '{component}' is not an integer")]
    InvalidVersion {
        name: String,
        version: String,
        component: String,
    },

    /// The precedence tree selected a source that has no candidate.
    ///
    /// An unversioned declared artifact such as `tweaks.jar` never beats an
    /// empty snapshot slot, so a group overriding it ends here.
    #[error("no usable candidate for '{logical_name}'")]
    NoCandidate { logical_name: String },

    /// A manifest path or local file could not be expressed as a URL.
    #[error("invalid artifact location '{location}'")]
    InvalidLocation { location: String },

    /// A source directory could not be listed.
    #[error("cannot read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A file could not be hashed.
    #[error("cannot hash {path}: {source}")]
    Hash {
        path: PathBuf,
        source: std::io::Error,
    },

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
