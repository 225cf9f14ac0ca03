//! `overlay.toml` parsing.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use overlay_materialize::{FetchConfig, ReconcileConfig};
use overlay_registry::Layout;
use serde::{Deserialize, Serialize};

/// Name of the configuration file.
pub const CONFIG_FILE: &str = "overlay.toml";

/// The top-level configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Launcher base directory (defaults to `~/.runelite`).
    #[serde(default)]
    pub base_dir: Option<PathBuf>,
    /// Download settings.
    #[serde(default)]
    pub fetch: FetchConfig,
}

impl OverlayConfig {
    /// Load an explicit config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// Search upward from `start_dir` for an `overlay.toml` file.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<Self>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.is_file() {
                return Self::load(&candidate).map(Some);
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Resolve the config: an explicit file wins, then the nearest
    /// `overlay.toml`, then defaults.
    pub fn resolve(explicit: Option<&Path>, cwd: &Path) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => Ok(Self::find_and_load(cwd)?.unwrap_or_default()),
        }
    }

    /// The launcher layout, with `base_dir` taking precedence over the file.
    pub fn layout(&self, base_dir: Option<&Path>) -> Result<Layout> {
        if let Some(dir) = base_dir.or(self.base_dir.as_deref()) {
            return Ok(Layout::new(dir.to_path_buf()));
        }
        Layout::default_location().context("cannot determine home directory; pass --base-dir")
    }

    /// Settings for a reconciliation run.
    pub fn reconcile_config(&self, base_dir: Option<&Path>) -> Result<ReconcileConfig> {
        Ok(ReconcileConfig {
            layout: self.layout(base_dir)?,
            fetch: self.fetch.clone(),
        })
    }
}
