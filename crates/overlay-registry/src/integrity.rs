//! Content hashing for artifact integrity checks.
//!
//! Every artifact is identified on disk by the SHA-256 of its full content,
//! hex-encoded in lowercase to match the hashes carried by the manifest.

use std::fs::File;
use std::io;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{RegistryError, Result};

/// A content hash (SHA-256 hex digest).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash(pub String);

impl ContentHash {
    /// Compute the SHA-256 hash of the given data.
    pub fn compute(data: &[u8]) -> Self {
        ContentHash(hex::encode(Sha256::digest(data)))
    }

    /// Stream a file through SHA-256.
    pub fn of_file(path: &Path) -> Result<Self> {
        Self::try_of_file(path).map_err(|source| RegistryError::Hash {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Like [`ContentHash::of_file`], but a missing file yields `None`.
    pub fn of_file_if_exists(path: &Path) -> Result<Option<Self>> {
        match Self::try_of_file(path) {
            Ok(hash) => Ok(Some(hash)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(RegistryError::Hash {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    fn try_of_file(path: &Path) -> io::Result<Self> {
        let mut file = File::open(path)?;
        let mut hasher = Sha256::new();
        io::copy(&mut file, &mut hasher)?;
        Ok(ContentHash(hex::encode(hasher.finalize())))
    }

    /// Get the hex string representation.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this hash equals a hex digest given as text (case-insensitive).
    pub fn matches(&self, expected: &str) -> bool {
        self.0.eq_ignore_ascii_case(expected)
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ContentHash {
    fn from(s: &str) -> Self {
        ContentHash(s.to_ascii_lowercase())
    }
}
