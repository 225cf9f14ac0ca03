//! Launcher manifest data model.
//!
//! The manifest arrives already deserialized from the launcher's bootstrap
//! document. Only the fields the resolver touches are typed; everything else
//! is carried through untouched so a corrected manifest can be written back.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{RegistryError, Result};
use crate::integrity::ContentHash;

/// A named, hash-addressed archive required at launch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// Archive filename.
    pub name: String,
    /// Download location (URL string).
    pub path: String,
    /// Hex SHA-256 of the archive content.
    pub hash: String,
    /// Declared size in bytes.
    #[serde(default)]
    pub size: u64,
    /// Fields this crate does not interpret.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Artifact {
    /// Build an artifact describing a local file: its name, `file:` URL,
    /// fresh content hash and current size.
    pub fn from_file(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| RegistryError::InvalidLocation {
                location: path.display().to_string(),
            })?
            .to_string();
        let url = file_url(path)?;
        let size = std::fs::metadata(path)?.len();
        let hash = ContentHash::of_file(path)?;
        Ok(Artifact {
            name,
            path: url.to_string(),
            hash: hash.0,
            size,
            extra: serde_json::Map::new(),
        })
    }

    /// Parse the artifact's download location.
    pub fn location(&self) -> Result<Url> {
        Url::parse(&self.path).map_err(|_| RegistryError::InvalidLocation {
            location: self.path.clone(),
        })
    }
}

/// The launcher manifest: artifacts plus client JVM arguments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Artifacts required at launch.
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    /// JVM arguments for the client.
    #[serde(default)]
    pub client_jvm_arguments: Vec<String>,
    /// JVM arguments for the client on Java 9+.
    #[serde(default)]
    pub client_jvm9_arguments: Vec<String>,
    /// Fields this crate does not interpret.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Manifest {
    /// Parse a manifest from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serialize the manifest as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Express an absolute local path as a `file:` URL.
pub fn file_url(path: &Path) -> Result<Url> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    Url::from_file_path(&absolute).map_err(|_| RegistryError::InvalidLocation {
        location: path.display().to_string(),
    })
}

/// The local path behind a `file:` location.
pub fn local_path(location: &Url) -> Option<PathBuf> {
    if location.scheme() == "file" {
        location.to_file_path().ok()
    } else {
        None
    }
}
