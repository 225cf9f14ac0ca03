//! Reconciliation report.

use std::fmt;

use overlay_registry::Source;

use crate::snapshot::{GroupReport, SlotOutcome};

/// One artifact of the reconciled manifest and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciledArtifact {
    pub name: String,
    pub source: Source,
}

/// Summary of a reconciliation run.
#[derive(Debug, Clone, Default)]
pub struct ReconcileReport {
    /// Total run duration in milliseconds.
    pub duration_ms: u64,
    /// True when `patches/` was empty and the manifest was left unchanged.
    pub short_circuited: bool,
    /// Override groups that were materialized.
    pub groups: Vec<GroupReport>,
    /// Final artifact list, in manifest order.
    pub artifacts: Vec<ReconciledArtifact>,
    /// Artifacts whose cached copy still mismatches the declared hash.
    pub integrity_failures: Vec<String>,
}

impl ReconcileReport {
    /// Whether every artifact passed verification.
    pub fn is_valid(&self) -> bool {
        self.integrity_failures.is_empty()
    }

    /// Number of final artifacts taken from `source`.
    pub fn count(&self, source: Source) -> usize {
        self.artifacts.iter().filter(|a| a.source == source).count()
    }
}

impl fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Reconcile Report ===")?;
        writeln!(f, "Duration: {} ms", self.duration_ms)?;
        if self.short_circuited {
            writeln!(f, "No overrides present; manifest unchanged")?;
            return Ok(());
        }

        if !self.groups.is_empty() {
            writeln!(f)?;
            writeln!(f, "--- Override Groups ({}) ---", self.groups.len())?;
            for group in &self.groups {
                let state = match &group.outcome {
                    SlotOutcome::Created { .. } => "created",
                    SlotOutcome::Current { .. } => "current",
                    SlotOutcome::Refreshed { .. } => "refreshed",
                };
                let file = group
                    .outcome
                    .file()
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                writeln!(
                    f,
                    "  {}: {} ({state}, {} overlays)",
                    group.logical_name,
                    file,
                    group.overlays.len()
                )?;
            }
        }

        writeln!(f)?;
        writeln!(f, "--- Artifacts ({}) ---", self.artifacts.len())?;
        for source in [Source::Overrides, Source::Snapshots, Source::Declared] {
            writeln!(f, "  {}: {}", source.label(), self.count(source))?;
        }

        writeln!(f)?;
        writeln!(
            f,
            "--- Verification: {} ---",
            if self.is_valid() { "PASSED" } else { "FAILED" }
        )?;
        for name in &self.integrity_failures {
            writeln!(f, "  hash mismatch: {name}")?;
        }

        Ok(())
    }
}
