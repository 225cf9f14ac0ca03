//! `overlay hash`: print the content hash of a file.

use std::path::Path;

use anyhow::{Context, Result};
use overlay_registry::{ContentHash, Identity};

/// Print the hash, size and identity of `file`.
pub fn run(file: &Path) -> Result<()> {
    let hash = ContentHash::of_file(file).with_context(|| format!("hashing {}", file.display()))?;
    let size = std::fs::metadata(file)
        .with_context(|| format!("reading {}", file.display()))?
        .len();
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    println!("{hash}  {}", file.display());
    println!("  size:     {size} bytes");
    println!("  identity: {}", Identity::parse(&name));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client-1.0.0.jar");
        std::fs::write(&path, b"client").unwrap();
        run(&path).unwrap();
    }

    #[test]
    fn hash_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(&dir.path().join("missing.jar")).unwrap_err();
        assert!(format!("{err:#}").contains("missing.jar"));
    }
}
