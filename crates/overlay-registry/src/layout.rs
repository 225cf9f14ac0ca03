//! On-disk layout of the launcher's user directory.
//!
//! Layout:
//! ```text
//! <base>/
//!   repository2/          cached artifacts (flat *.jar)
//!   patches/
//!     *.jar               standalone overrides
//!     <group>/            one override group per directory
//!       *.jar             override archives
//!       snapshot/         0 or 1 materialized baseline
//! ```

use std::path::{Path, PathBuf};

/// Cached artifact directory name.
pub const REPOSITORY_DIR: &str = "repository2";
/// Override directory name.
pub const PATCHES_DIR: &str = "patches";
/// Snapshot slot directory name inside each override group.
pub const SNAPSHOT_DIR: &str = "snapshot";

/// Paths derived from the launcher's base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    base: PathBuf,
}

impl Layout {
    /// Create a layout rooted at the given directory.
    pub fn new(base: PathBuf) -> Self {
        Layout { base }
    }

    /// The default location (`~/.runelite`).
    pub fn default_location() -> Option<Self> {
        home_dir().map(|home| Layout::new(home.join(".runelite")))
    }

    /// Get the base directory.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Directory holding previously resolved artifacts.
    pub fn repository_dir(&self) -> PathBuf {
        self.base.join(REPOSITORY_DIR)
    }

    /// Directory holding overrides and override groups.
    pub fn patches_dir(&self) -> PathBuf {
        self.base.join(PATCHES_DIR)
    }

    /// Cached copy of the artifact with the given filename.
    pub fn cached_artifact(&self, name: &str) -> PathBuf {
        self.repository_dir().join(name)
    }
}

/// Snapshot slot of an override group directory.
pub fn snapshot_slot(group_dir: &Path) -> PathBuf {
    group_dir.join(SNAPSHOT_DIR)
}

/// Get the user's home directory.
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_paths() {
        let layout = Layout::new(PathBuf::from("/home/u/.runelite"));
        assert_eq!(layout.repository_dir(), Path::new("/home/u/.runelite/repository2"));
        assert_eq!(layout.patches_dir(), Path::new("/home/u/.runelite/patches"));
        assert_eq!(
            layout.cached_artifact("client-1.0.jar"),
            Path::new("/home/u/.runelite/repository2/client-1.0.jar")
        );
        assert_eq!(
            snapshot_slot(&layout.patches_dir().join("ui-fix")),
            Path::new("/home/u/.runelite/patches/ui-fix/snapshot")
        );
    }
}
