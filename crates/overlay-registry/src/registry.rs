//! The four artifact sources consulted during one resolution run.
//!
//! - **Declared**: artifacts listed by the manifest (remote URLs).
//! - **Cached**: archives in the local repository directory.
//! - **Overrides**: standalone archives directly inside the patches directory.
//! - **Snapshots**: materialized override-group baselines.
//!
//! Each table is keyed by full filename. A [`SourceRegistry`] belongs to a
//! single run: the reconciler builds it, threads it through every component,
//! and drops it when the corrected manifest is produced.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use url::Url;

use crate::error::{RegistryError, Result};
use crate::identity::{Identity, ARCHIVE_EXTENSION};
use crate::integrity::ContentHash;
use crate::manifest::{file_url, local_path, Manifest};

/// Which table an entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Source {
    Declared,
    Cached,
    Overrides,
    Snapshots,
}

impl Source {
    /// Lowercase label.
    pub fn label(&self) -> &'static str {
        match self {
            Source::Declared => "declared",
            Source::Cached => "cached",
            Source::Overrides => "override",
            Source::Snapshots => "snapshot",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One candidate artifact: its identity, where to get it, and its hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    pub identity: Identity,
    pub location: Url,
    pub hash: ContentHash,
}

impl RegistryEntry {
    /// Create an entry for a named artifact.
    pub fn new(name: &str, location: Url, hash: ContentHash) -> Self {
        RegistryEntry {
            identity: Identity::parse(name),
            location,
            hash,
        }
    }

    /// Create an entry for a local file, hashing its current content.
    pub fn local(path: &Path) -> Result<Self> {
        let name = file_name(path)?;
        let hash = ContentHash::of_file(path)?;
        Ok(RegistryEntry::new(&name, file_url(path)?, hash))
    }

    /// Full filename.
    pub fn name(&self) -> &str {
        &self.identity.full_name
    }

    /// The local path behind a `file:` location.
    pub fn local_path(&self) -> Option<PathBuf> {
        local_path(&self.location)
    }
}

impl AsRef<Identity> for RegistryEntry {
    fn as_ref(&self) -> &Identity {
        &self.identity
    }
}

/// Run-scoped lookup tables for every artifact source.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    declared: BTreeMap<String, RegistryEntry>,
    cached: BTreeMap<String, RegistryEntry>,
    overrides: BTreeMap<String, RegistryEntry>,
    snapshots: BTreeMap<String, RegistryEntry>,
}

impl SourceRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start building the Declared, Cached and Overrides tables.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// The table for one source.
    pub fn table(&self, source: Source) -> &BTreeMap<String, RegistryEntry> {
        match source {
            Source::Declared => &self.declared,
            Source::Cached => &self.cached,
            Source::Overrides => &self.overrides,
            Source::Snapshots => &self.snapshots,
        }
    }

    /// Look up an entry by full filename.
    pub fn get(&self, source: Source, name: &str) -> Option<&RegistryEntry> {
        self.table(source).get(name)
    }

    /// Entries of one source that share a logical name, in filename order.
    pub fn candidates(&self, source: Source, logical_name: &str) -> Vec<&RegistryEntry> {
        self.table(source)
            .values()
            .filter(|e| e.identity.logical_name() == logical_name)
            .collect()
    }

    /// Register a materialized snapshot file under its current name.
    pub fn register_snapshot(&mut self, path: &Path) -> Result<&RegistryEntry> {
        let entry = RegistryEntry::local(path)?;
        let name = entry.name().to_string();
        tracing::debug!("Registered snapshot {} ({})", name, entry.hash);
        self.snapshots.insert(name.clone(), entry);
        Ok(&self.snapshots[&name])
    }

    /// Drop a snapshot entry, returning it if it was registered.
    pub fn unregister_snapshot(&mut self, name: &str) -> Option<RegistryEntry> {
        self.snapshots.remove(name)
    }

    /// Total number of entries across all tables.
    pub fn len(&self) -> usize {
        self.declared.len() + self.cached.len() + self.overrides.len() + self.snapshots.len()
    }

    /// Whether every table is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Empty all four tables.
    pub fn clear(&mut self) {
        self.declared.clear();
        self.cached.clear();
        self.overrides.clear();
        self.snapshots.clear();
    }
}

/// Collects the scanned sources before they are frozen into a [`SourceRegistry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    declared: BTreeMap<String, RegistryEntry>,
    cached: BTreeMap<String, RegistryEntry>,
    overrides: BTreeMap<String, RegistryEntry>,
}

impl RegistryBuilder {
    /// One Declared entry per manifest artifact.
    pub fn declared(mut self, manifest: &Manifest) -> Result<Self> {
        for artifact in &manifest.artifacts {
            let entry = RegistryEntry::new(
                &artifact.name,
                artifact.location()?,
                ContentHash::from(artifact.hash.as_str()),
            );
            self.declared.insert(artifact.name.clone(), entry);
        }
        Ok(self)
    }

    /// One Cached entry per archive in the repository directory.
    ///
    /// A missing directory contributes nothing.
    pub fn cached(mut self, repository_dir: &Path) -> Result<Self> {
        scan_into(&mut self.cached, repository_dir)?;
        Ok(self)
    }

    /// One Overrides entry per archive directly inside the patches directory.
    ///
    /// The directory is created if it does not exist yet.
    pub fn overrides(mut self, patches_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(patches_dir)?;
        scan_into(&mut self.overrides, patches_dir)?;
        Ok(self)
    }

    /// Freeze the scanned tables. Snapshots start empty.
    pub fn build(self) -> SourceRegistry {
        tracing::debug!(
            declared = self.declared.len(),
            cached = self.cached.len(),
            overrides = self.overrides.len(),
            "Built source registry"
        );
        SourceRegistry {
            declared: self.declared,
            cached: self.cached,
            overrides: self.overrides,
            snapshots: BTreeMap::new(),
        }
    }
}

fn scan_into(table: &mut BTreeMap<String, RegistryEntry>, dir: &Path) -> Result<()> {
    for path in list_archives(dir)? {
        let entry = RegistryEntry::local(&path)?;
        table.insert(entry.name().to_string(), entry);
    }
    Ok(())
}

/// List the `*.jar` regular files directly inside `dir`, sorted by name.
///
/// Returns an empty list if the directory does not exist.
pub fn list_archives(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut archives: Vec<PathBuf> = list_dir(dir)?
        .into_iter()
        .filter(|p| p.is_file() && has_archive_extension(p))
        .collect();
    archives.sort();
    Ok(archives)
}

/// List every entry directly inside `dir`, sorted by name.
pub fn list_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let read_err = |source| RegistryError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read_err)? {
        paths.push(entry.map_err(read_err)?.path());
    }
    paths.sort();
    Ok(paths)
}

/// Whether the path names an archive.
pub fn has_archive_extension(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(ARCHIVE_EXTENSION))
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| RegistryError::InvalidLocation {
            location: path.display().to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Artifact;

    fn manifest(names: &[&str]) -> Manifest {
        Manifest {
            artifacts: names
                .iter()
                .map(|n| Artifact {
                    name: n.to_string(),
                    path: format!("https://repo.example.net/{n}"),
                    hash: "AB12".to_string(),
                    size: 0,
                    extra: Default::default(),
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn builds_all_three_scanned_tables() {
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path().join("repository2");
        let patches = dir.path().join("patches");
        std::fs::create_dir_all(&repo).unwrap();
        std::fs::write(repo.join("client-1.0.0.jar"), b"cached").unwrap();
        std::fs::write(repo.join("notes.txt"), b"ignored").unwrap();
        std::fs::create_dir_all(repo.join("dir.jar")).unwrap();

        let registry = SourceRegistry::builder()
            .declared(&manifest(&["client-1.0.0.jar", "api-2.jar"]))
            .unwrap()
            .cached(&repo)
            .unwrap()
            .overrides(&patches)
            .unwrap()
            .build();

        assert!(patches.is_dir(), "override directory is created");
        assert_eq!(registry.table(Source::Declared).len(), 2);
        assert_eq!(registry.table(Source::Cached).len(), 1);
        assert!(registry.table(Source::Overrides).is_empty());
        assert!(registry.table(Source::Snapshots).is_empty());

        let cached = registry.get(Source::Cached, "client-1.0.0.jar").unwrap();
        assert_eq!(cached.hash, ContentHash::compute(b"cached"));
        assert_eq!(cached.local_path().unwrap(), repo.join("client-1.0.0.jar"));

        let declared = registry.get(Source::Declared, "api-2.jar").unwrap();
        assert_eq!(declared.hash.as_str(), "ab12");
        assert!(declared.local_path().is_none());
    }

    #[test]
    fn overrides_skip_group_directories() {
        let dir = tempfile::tempdir().unwrap();
        let patches = dir.path().join("patches");
        std::fs::create_dir_all(patches.join("ui-fix").join("snapshot")).unwrap();
        std::fs::write(patches.join("ui-fix").join("ui-fix-2.0.jar"), b"x").unwrap();
        std::fs::write(patches.join("extra-1.0.jar"), b"y").unwrap();

        let registry = SourceRegistry::builder().overrides(&patches).unwrap().build();
        let names: Vec<_> = registry.table(Source::Overrides).keys().cloned().collect();
        assert_eq!(names, vec!["extra-1.0.jar"]);
    }

    #[test]
    fn missing_cache_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SourceRegistry::builder()
            .cached(&dir.path().join("absent"))
            .unwrap()
            .build();
        assert!(registry.is_empty());
    }

    #[test]
    fn unreadable_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain-file");
        std::fs::write(&file, b"").unwrap();
        let err = list_dir(&file).unwrap_err();
        assert!(matches!(err, RegistryError::ReadDir { .. }));
    }

    #[test]
    fn candidates_match_logical_name() {
        let registry = SourceRegistry::builder()
            .declared(&manifest(&["ui-fix-1.0.jar", "ui-fix-1.1.jar", "client-1.0.jar"]))
            .unwrap()
            .build();
        let found: Vec<_> = registry
            .candidates(Source::Declared, "ui-fix")
            .into_iter()
            .map(|e| e.name().to_string())
            .collect();
        assert_eq!(found, vec!["ui-fix-1.0.jar", "ui-fix-1.1.jar"]);
    }

    #[test]
    fn candidates_outlive_the_lookup_key() {
        let registry = SourceRegistry::builder()
            .declared(&manifest(&["ui-fix-1.0.jar"]))
            .unwrap()
            .build();
        let found = {
            let key = String::from("ui-fix");
            registry.candidates(Source::Declared, &key)
        };
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name(), "ui-fix-1.0.jar");
    }

    #[test]
    fn snapshot_register_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client-1.0.jar");
        std::fs::write(&path, b"merged").unwrap();

        let mut registry = SourceRegistry::new();
        let entry = registry.register_snapshot(&path).unwrap();
        assert_eq!(entry.name(), "client-1.0.jar");
        assert!(registry.get(Source::Snapshots, "client-1.0.jar").is_some());

        assert!(registry.unregister_snapshot("client-1.0.jar").is_some());
        assert!(registry.unregister_snapshot("client-1.0.jar").is_none());

        registry.register_snapshot(&path).unwrap();
        registry.clear();
        assert!(registry.is_empty());
    }
}
