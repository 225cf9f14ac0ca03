//! `overlay resolve`: reconcile a launcher manifest against local overrides.

use std::path::Path;

use anyhow::{bail, Context, Result};
use overlay_materialize::{ReconcileConfig, Reconciler};
use overlay_registry::Manifest;

/// Reconcile the manifest at `manifest_path` and write the result to
/// `output` (stdout when `None`).
///
/// The run is aborted when any artifact fails verification, unless
/// `allow_mismatch` is set.
pub fn run(
    config: ReconcileConfig,
    manifest_path: &Path,
    output: Option<&Path>,
    args: &[String],
    allow_mismatch: bool,
) -> Result<()> {
    let text = std::fs::read_to_string(manifest_path)
        .with_context(|| format!("reading {}", manifest_path.display()))?;
    let mut manifest = Manifest::from_json(&text)
        .with_context(|| format!("parsing {}", manifest_path.display()))?;

    let reconciler = Reconciler::new(config).context("creating reconciler")?;
    let progress = |name: &str, done: u64, total: u64| {
        tracing::debug!("{}: {}/{} bytes", name, done, total);
    };
    let result = reconciler
        .reconcile(&mut manifest, args, &progress)
        .with_context(|| format!("reconciling {}", manifest_path.display()))?;

    eprint!("{}", result.report);
    tracing::info!("Launch arguments: {}", result.args.join(" "));

    if !result.report.is_valid() && !allow_mismatch {
        bail!(
            "{} artifact(s) failed verification: {}",
            result.report.integrity_failures.len(),
            result.report.integrity_failures.join(", ")
        );
    }

    let json = manifest.to_json().context("serializing manifest")?;
    match output {
        Some(path) => std::fs::write(path, json + "\n")
            .with_context(|| format!("writing {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use overlay_materialize::FetchConfig;
    use overlay_registry::{Artifact, Layout};

    fn config(base: &Path) -> ReconcileConfig {
        ReconcileConfig {
            layout: Layout::new(base.to_path_buf()),
            fetch: FetchConfig::default(),
        }
    }

    #[test]
    fn resolve_writes_reconciled_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let upstream = dir.path().join("gson-2.8.jar");
        std::fs::write(&upstream, b"gson").unwrap();
        let manifest = Manifest {
            artifacts: vec![Artifact::from_file(&upstream).unwrap()],
            ..Default::default()
        };
        let input = dir.path().join("bootstrap.json");
        std::fs::write(&input, manifest.to_json().unwrap()).unwrap();

        let base = dir.path().join("base");
        let patches = base.join("patches");
        std::fs::create_dir_all(&patches).unwrap();
        std::fs::write(patches.join("gson-3.0.jar"), b"local gson").unwrap();

        let output = dir.path().join("out.json");
        run(config(&base), &input, Some(&output), &[], false).unwrap();

        let written = Manifest::from_json(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written.artifacts.len(), 1);
        assert_eq!(written.artifacts[0].name, "gson-3.0.jar");
        assert_eq!(written.client_jvm_arguments, vec!["-ea"]);
    }

    #[test]
    fn resolve_rejects_integrity_failures() {
        let dir = tempfile::tempdir().unwrap();
        let upstream = dir.path().join("gson-2.8.jar");
        std::fs::write(&upstream, b"gson").unwrap();
        let mut artifact = Artifact::from_file(&upstream).unwrap();
        artifact.hash = "00".repeat(32);
        let manifest = Manifest {
            artifacts: vec![artifact],
            ..Default::default()
        };
        let input = dir.path().join("bootstrap.json");
        std::fs::write(&input, manifest.to_json().unwrap()).unwrap();

        let base = dir.path().join("base");
        std::fs::create_dir_all(base.join("patches")).unwrap();
        std::fs::write(base.join("patches").join("extra-1.0.jar"), b"x").unwrap();

        let output = dir.path().join("out.json");
        let err = run(config(&base), &input, Some(&output), &[], false).unwrap_err();
        assert!(err.to_string().contains("gson-2.8.jar"));
        assert!(!output.exists());

        run(config(&base), &input, Some(&output), &[], true).unwrap();
        assert!(output.exists());
    }

    #[test]
    fn resolve_reports_unreadable_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("bootstrap.json");
        std::fs::write(&input, "{ not json").unwrap();
        let err = run(config(dir.path()), &input, None, &[], false).unwrap_err();
        assert!(format!("{err:#}").contains("parsing"));
    }
}
