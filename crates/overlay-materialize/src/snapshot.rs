//! Snapshot materialization for override groups.
//!
//! Every directory inside `patches/` is an override group: a set of override
//! archives plus a `snapshot/` slot holding at most one materialized
//! baseline. Materializing downloads the up-to-date baseline and overlays
//! the group's archives onto it inside a hidden scratch directory in the
//! slot; only a fully merged archive is moved into place. A slot that
//! already holds a baseline is kept until a newer one resolves elsewhere, at
//! which point it is replaced.

use std::path::{Path, PathBuf};

use overlay_registry::{
    file_url, list_dir, local_path, resolve, snapshot_slot, Identity, Layout, Resolution, Source,
    SourceRegistry,
};

use crate::archive::{overlay_group, OverlayStats, SCRATCH_PREFIX};
use crate::error::{MaterializeError, Result};
use crate::fetch::{location_file_name, remove_stale, Fetcher, ProgressSink};

/// What happened to a group's snapshot slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotOutcome {
    /// The slot was empty and a baseline was materialized.
    Created { file: PathBuf },
    /// The existing baseline is still the up-to-date one.
    Current { file: PathBuf },
    /// A newer baseline replaced the existing one.
    Refreshed { stale: PathBuf, file: PathBuf },
}

impl SlotOutcome {
    /// The slot's file after materialization.
    pub fn file(&self) -> &Path {
        match self {
            SlotOutcome::Created { file }
            | SlotOutcome::Current { file }
            | SlotOutcome::Refreshed { file, .. } => file,
        }
    }
}

/// Result of materializing one override group.
#[derive(Debug, Clone)]
pub struct GroupReport {
    /// The group directory.
    pub group: PathBuf,
    /// Logical name the group resolved under.
    pub logical_name: String,
    /// Source the baseline came from, if a resolution was made.
    pub baseline_source: Option<Source>,
    /// What happened to the slot.
    pub outcome: SlotOutcome,
    /// Overlay passes applied to a newly fetched baseline.
    pub overlays: Vec<OverlayStats>,
}

/// Materializes override-group snapshots.
pub struct Materializer<'a> {
    layout: &'a Layout,
    fetcher: &'a Fetcher,
    progress: &'a dyn ProgressSink,
}

impl<'a> Materializer<'a> {
    pub fn new(layout: &'a Layout, fetcher: &'a Fetcher, progress: &'a dyn ProgressSink) -> Self {
        Materializer {
            layout,
            fetcher,
            progress,
        }
    }

    /// Materialize every override group under the patches directory, in
    /// directory-name order, registering each snapshot.
    pub fn materialize_all(&self, registry: &mut SourceRegistry) -> Result<Vec<GroupReport>> {
        let patches = self.layout.patches_dir();
        if !patches.is_dir() {
            return Ok(Vec::new());
        }
        let mut reports = Vec::new();
        for group in list_dir(&patches)? {
            if group.is_dir() {
                reports.push(self.materialize_group(registry, &group)?);
            }
        }
        Ok(reports)
    }

    /// Ensure one group's slot holds an up-to-date baseline.
    pub fn materialize_group(
        &self,
        registry: &mut SourceRegistry,
        group: &Path,
    ) -> Result<GroupReport> {
        let slot = snapshot_slot(group);
        std::fs::create_dir_all(&slot)?;

        let files = slot_files(&slot)?;
        match files.as_slice() {
            [] => self.create(registry, group, &slot),
            [current] => self.refresh(registry, group, &slot, current),
            _ => Err(MaterializeError::SlotConflict {
                path: slot,
                count: files.len(),
            }),
        }
    }

    fn create(
        &self,
        registry: &mut SourceRegistry,
        group: &Path,
        slot: &Path,
    ) -> Result<GroupReport> {
        let logical_name = group_logical_name(group);
        let resolution = resolve(registry, &logical_name, &file_url(group)?)?;
        if resolution.source.is_none() {
            return Err(MaterializeError::NoBaseline {
                group: group.to_path_buf(),
            });
        }

        let (file, overlays) = self.install(registry, group, slot, &resolution, None)?;
        tracing::info!(
            "Materialized {} from {} baseline {}",
            file.display(),
            label(&resolution),
            resolution.location
        );
        Ok(GroupReport {
            group: group.to_path_buf(),
            logical_name,
            baseline_source: resolution.source,
            outcome: SlotOutcome::Created { file },
            overlays,
        })
    }

    fn refresh(
        &self,
        registry: &mut SourceRegistry,
        group: &Path,
        slot: &Path,
        current: &Path,
    ) -> Result<GroupReport> {
        let name = registry.register_snapshot(current)?.name().to_string();
        let logical_name = Identity::parse(&name).logical_name().to_string();
        let resolution = resolve(registry, &logical_name, &file_url(current)?)?;

        if local_path(&resolution.location).as_deref() == Some(current) {
            tracing::debug!("Snapshot {} is up to date", current.display());
            return Ok(GroupReport {
                group: group.to_path_buf(),
                logical_name,
                baseline_source: resolution.source,
                outcome: SlotOutcome::Current {
                    file: current.to_path_buf(),
                },
                overlays: Vec::new(),
            });
        }

        registry.unregister_snapshot(&name);
        let (file, overlays) = self.install(registry, group, slot, &resolution, Some(current))?;
        tracing::info!(
            "Refreshed {} with {} baseline {}",
            file.display(),
            label(&resolution),
            resolution.location
        );
        Ok(GroupReport {
            group: group.to_path_buf(),
            logical_name,
            baseline_source: resolution.source,
            outcome: SlotOutcome::Refreshed {
                stale: current.to_path_buf(),
                file,
            },
            overlays,
        })
    }

    /// Download the resolved baseline, overlay the group's archives onto it,
    /// then move it into the slot in place of `stale` and register it.
    ///
    /// Everything up to the final move happens in a scratch directory that
    /// is removed on failure, so an error leaves the slot as it was.
    fn install(
        &self,
        registry: &mut SourceRegistry,
        group: &Path,
        slot: &Path,
        resolution: &Resolution,
        stale: Option<&Path>,
    ) -> Result<(PathBuf, Vec<OverlayStats>)> {
        let file_name = location_file_name(&resolution.location)?;
        let dest = slot.join(&file_name);

        let scratch = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(slot)?;
        let staged = scratch.path().join(&file_name);
        self.fetcher
            .fetch(&resolution.location, &staged, 0, self.progress)?;
        let overlays = overlay_group(&staged, group)?;

        if let Some(stale) = stale.filter(|s| *s != dest.as_path()) {
            remove_stale(stale);
        }
        std::fs::rename(&staged, &dest)?;
        registry.register_snapshot(&dest)?;
        Ok((dest, overlays))
    }
}

/// Logical name an override group directory addresses.
pub fn group_logical_name(group: &Path) -> String {
    let dir_name = group
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Identity::parse(&dir_name).logical_name().to_string()
}

/// Regular files in a slot. Hidden files, such as scratch files left by an
/// interrupted overlay, are not counted.
pub fn slot_files(slot: &Path) -> Result<Vec<PathBuf>> {
    Ok(list_dir(slot)?
        .into_iter()
        .filter(|p| p.is_file())
        .filter(|p| {
            !p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('.'))
        })
        .collect())
}

fn label(resolution: &Resolution) -> &'static str {
    resolution.source.map(|s| s.label()).unwrap_or("fallback")
}
