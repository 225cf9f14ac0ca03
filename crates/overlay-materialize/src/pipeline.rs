//! Manifest reconciliation orchestrator.

use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

use overlay_registry::{
    list_dir, newest, Artifact, Identity, Layout, Manifest, RegistryEntry, Source, SourceRegistry,
};

use crate::args::{patch_jvm_args, patch_launch_args};
use crate::error::{MaterializeError, Result};
use crate::fetch::{FetchConfig, Fetcher, ProgressSink};
use crate::report::{ReconcileReport, ReconciledArtifact};
use crate::snapshot::Materializer;

/// Configuration for a reconciliation run.
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Base directory holding the cache and the patches.
    pub layout: Layout,
    /// Download settings.
    pub fetch: FetchConfig,
}

/// Output of a successful reconciliation run.
#[derive(Debug)]
pub struct ReconcileOutput {
    /// Launch arguments with the developer flags added.
    pub args: Vec<String>,
    /// Run report.
    pub report: ReconcileReport,
}

/// Rewrites launcher manifests so that local overrides take effect.
pub struct Reconciler {
    layout: Layout,
    fetcher: Fetcher,
}

impl Reconciler {
    pub fn new(config: ReconcileConfig) -> Result<Self> {
        Ok(Reconciler {
            fetcher: Fetcher::new(config.fetch)?,
            layout: config.layout,
        })
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Run the full reconciliation:
    /// patch arguments -> build registries -> materialize snapshots ->
    /// assemble artifacts -> verify cache -> report.
    ///
    /// `manifest` is only modified when the whole run succeeds.
    pub fn reconcile(
        &self,
        manifest: &mut Manifest,
        args: &[String],
        progress: &dyn ProgressSink,
    ) -> Result<ReconcileOutput> {
        let start = Instant::now();
        let mut working = manifest.clone();

        // Stage 1: Launch arguments
        let args = patch_launch_args(args);
        patch_jvm_args(&mut working);

        // Stage 2: Nothing to overlay
        let patches = self.layout.patches_dir();
        std::fs::create_dir_all(&patches)?;
        if list_dir(&patches)?.is_empty() {
            tracing::info!("No overrides in {}; manifest unchanged", patches.display());
            *manifest = working;
            return Ok(ReconcileOutput {
                args,
                report: ReconcileReport {
                    duration_ms: start.elapsed().as_millis() as u64,
                    short_circuited: true,
                    ..ReconcileReport::default()
                },
            });
        }

        // Stage 3: Registries and snapshots
        let mut registry = SourceRegistry::builder()
            .declared(&working)?
            .cached(&self.layout.repository_dir())?
            .overrides(&patches)?
            .build();
        let groups = Materializer::new(&self.layout, &self.fetcher, progress)
            .materialize_all(&mut registry)?;

        // Stage 4: Final artifact list
        let (artifacts, sources) = assemble(&registry, &working.artifacts)?;

        // Stage 5: Cache verification
        let mut integrity_failures = Vec::new();
        for artifact in &artifacts {
            if !self.fetcher.verify(&self.layout, artifact, progress)? {
                integrity_failures.push(artifact.name.clone());
            }
        }

        working.artifacts = artifacts;
        registry.clear();
        *manifest = working;

        let report = ReconcileReport {
            duration_ms: start.elapsed().as_millis() as u64,
            short_circuited: false,
            groups,
            artifacts: sources,
            integrity_failures,
        };
        tracing::info!(
            "Reconciled {} artifacts ({} override, {} snapshot, {} declared)",
            report.artifacts.len(),
            report.count(Source::Overrides),
            report.count(Source::Snapshots),
            report.count(Source::Declared)
        );
        Ok(ReconcileOutput { args, report })
    }
}

/// Build the final artifact list: overrides without a snapshot of the same
/// logical name, then snapshots, then declared artifacts whose logical name
/// is not taken yet.
fn assemble(
    registry: &SourceRegistry,
    declared: &[Artifact],
) -> Result<(Vec<Artifact>, Vec<ReconciledArtifact>)> {
    let snapshots = newest_per_logical_name(registry, Source::Snapshots)?;
    let overrides = newest_per_logical_name(registry, Source::Overrides)?;

    let mut taken = HashSet::new();
    let mut artifacts = Vec::new();
    let mut sources = Vec::new();

    let local = overrides
        .iter()
        .filter(|(logical, _)| !snapshots.contains_key(*logical))
        .map(|(logical, entry)| (logical, entry, Source::Overrides))
        .chain(
            snapshots
                .iter()
                .map(|(logical, entry)| (logical, entry, Source::Snapshots)),
        );
    for (logical, entry, source) in local {
        let path = entry
            .local_path()
            .ok_or_else(|| MaterializeError::UnnamedLocation {
                location: entry.location.to_string(),
            })?;
        taken.insert(logical.clone());
        artifacts.push(Artifact::from_file(&path)?);
        sources.push(ReconciledArtifact {
            name: entry.name().to_string(),
            source,
        });
    }

    for artifact in declared {
        let logical = Identity::parse(&artifact.name).logical_name().to_string();
        if !taken.insert(logical) {
            tracing::debug!("{} is replaced by a local artifact", artifact.name);
            continue;
        }
        artifacts.push(artifact.clone());
        sources.push(ReconciledArtifact {
            name: artifact.name.clone(),
            source: Source::Declared,
        });
    }

    Ok((artifacts, sources))
}

/// The newest entry of one source for each logical name.
fn newest_per_logical_name(
    registry: &SourceRegistry,
    source: Source,
) -> Result<BTreeMap<String, &RegistryEntry>> {
    let mut winners: BTreeMap<String, &RegistryEntry> = BTreeMap::new();
    for entry in registry.table(source).values() {
        let logical = entry.identity.logical_name().to_string();
        let best = match winners.get(&logical).copied() {
            Some(current) => newest(Some(current), Some(entry))?.unwrap_or(current),
            None => entry,
        };
        winners.insert(logical, best);
    }
    Ok(winners)
}
