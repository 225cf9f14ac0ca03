//! `overlay inspect`: show the local layout and, given a manifest, where
//! each artifact would resolve from. Nothing is downloaded or rewritten.

use std::path::Path;

use anyhow::{Context, Result};
use overlay_materialize::slot_files;
use overlay_registry::{
    list_dir, resolve, snapshot_slot, Identity, Layout, Manifest, Source, SourceRegistry,
};

/// Print the layout summary and an optional resolution preview.
pub fn run(layout: &Layout, manifest_path: Option<&Path>) -> Result<()> {
    let manifest = match manifest_path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            Manifest::from_json(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => Manifest::default(),
    };
    let registry = build_registry(layout, &manifest)?;

    println!("=== Overlay Layout ===");
    println!("Base: {}", layout.base().display());

    for source in [Source::Cached, Source::Overrides, Source::Snapshots] {
        let table = registry.table(source);
        println!();
        println!("--- {} ({}) ---", source.label(), table.len());
        for entry in table.values() {
            println!("  {}", entry.identity);
        }
    }

    if manifest_path.is_some() {
        println!();
        println!("--- Resolution ({} artifacts) ---", manifest.artifacts.len());
        for artifact in &manifest.artifacts {
            let logical = Identity::parse(&artifact.name).logical_name().to_string();
            let resolution = resolve(&registry, &logical, &artifact.location()?)
                .with_context(|| format!("resolving {}", artifact.name))?;
            let source = resolution.source.map(|s| s.label()).unwrap_or("fallback");
            println!("  {} -> {} ({})", artifact.name, source, resolution.location);
        }
    }

    Ok(())
}

/// Registry view of the current on-disk state, including snapshots already
/// materialized in well-formed slots.
fn build_registry(layout: &Layout, manifest: &Manifest) -> Result<SourceRegistry> {
    let patches = layout.patches_dir();
    let mut builder = SourceRegistry::builder()
        .declared(manifest)?
        .cached(&layout.repository_dir())?;
    if patches.is_dir() {
        builder = builder.overrides(&patches)?;
    }
    let mut registry = builder.build();

    if patches.is_dir() {
        for group in list_dir(&patches)? {
            let slot = snapshot_slot(&group);
            if !slot.is_dir() {
                continue;
            }
            if let [file] = slot_files(&slot)?.as_slice() {
                registry.register_snapshot(file)?;
            }
        }
    }
    Ok(registry)
}
