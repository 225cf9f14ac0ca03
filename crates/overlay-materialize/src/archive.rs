//! Overlaying override archives onto a baseline archive.
//!
//! Every entry of the source archive is copied into the destination. A
//! same-named file entry in the destination is replaced; an entry whose name
//! is a directory in the destination is skipped. The destination is
//! rewritten into a scratch file next to it and then moved into place, and
//! entries are copied raw (no recompression), so applying the same overlay
//! twice leaves every entry byte-for-byte as applying it once.

use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};

use overlay_registry::list_archives;
use zip::result::ZipError;
use zip::{ZipArchive, ZipWriter};

use crate::error::{MaterializeError, Result};

/// Prefix of the scratch file used while rewriting an archive.
pub const SCRATCH_PREFIX: &str = ".overlay-";

/// What one overlay pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlayStats {
    /// Archive the entries came from.
    pub source: PathBuf,
    /// Entries added that the destination did not have.
    pub added: usize,
    /// Destination file entries replaced by the source.
    pub replaced: usize,
    /// Source entries skipped because the destination has a directory there.
    pub skipped: usize,
}

/// Copy every entry of `source` into the archive at `dest`.
pub fn overlay(dest: &Path, source: &Path) -> Result<OverlayStats> {
    let mut src = open_archive(source)?;
    let mut base = open_archive(dest)?;

    let base_dirs = directory_names(&base);
    let base_files: HashSet<String> = base
        .file_names()
        .filter(|n| !n.ends_with('/'))
        .map(str::to_string)
        .collect();

    let mut stats = OverlayStats {
        source: source.to_path_buf(),
        ..OverlayStats::default()
    };
    let mut incoming = HashSet::new();
    let mut copy = Vec::new();
    for i in 0..src.len() {
        let name = src
            .by_index_raw(i)
            .map_err(|e| archive_error(source, e))?
            .name()
            .to_string();
        if base_dirs.contains(name.trim_end_matches('/')) {
            stats.skipped += 1;
            continue;
        }
        if base_files.contains(&name) {
            stats.replaced += 1;
        } else {
            stats.added += 1;
        }
        incoming.insert(name);
        copy.push(i);
    }

    let parent = dest.parent().unwrap_or_else(|| Path::new("."));
    let mut scratch = tempfile::Builder::new()
        .prefix(SCRATCH_PREFIX)
        .tempfile_in(parent)?;
    {
        let mut writer = ZipWriter::new(scratch.as_file_mut());
        for i in 0..base.len() {
            let entry = base.by_index_raw(i).map_err(|e| archive_error(dest, e))?;
            if incoming.contains(entry.name()) {
                continue;
            }
            writer
                .raw_copy_file(entry)
                .map_err(|e| archive_error(dest, e))?;
        }
        for i in copy {
            let entry = src.by_index_raw(i).map_err(|e| archive_error(source, e))?;
            writer
                .raw_copy_file(entry)
                .map_err(|e| archive_error(dest, e))?;
        }
        writer.finish().map_err(|e| archive_error(dest, e))?;
    }
    drop(base);
    scratch.persist(dest).map_err(|e| e.error)?;

    tracing::debug!(
        "Overlaid {} onto {}: {} added, {} replaced, {} skipped",
        source.display(),
        dest.display(),
        stats.added,
        stats.replaced,
        stats.skipped
    );
    Ok(stats)
}

/// Overlay every archive directly inside `group_dir` onto `dest`, in
/// filename order.
///
/// Subdirectories (including the snapshot slot) are not sources.
pub fn overlay_group(dest: &Path, group_dir: &Path) -> Result<Vec<OverlayStats>> {
    let mut applied = Vec::new();
    for source in list_archives(group_dir)? {
        if source == dest {
            continue;
        }
        applied.push(overlay(dest, &source)?);
    }
    Ok(applied)
}

fn open_archive(path: &Path) -> Result<ZipArchive<File>> {
    let file = File::open(path)?;
    ZipArchive::new(file).map_err(|e| archive_error(path, e))
}

/// Names that are directories in the archive, without trailing slash.
///
/// Includes directories that only exist implicitly as a prefix of some
/// entry, the way a mounted archive filesystem would report them.
fn directory_names(archive: &ZipArchive<File>) -> HashSet<String> {
    let mut dirs = HashSet::new();
    for name in archive.file_names() {
        let trimmed = name.trim_end_matches('/');
        if name.ends_with('/') {
            dirs.insert(trimmed.to_string());
        }
        let mut prefix = trimmed;
        while let Some((parent, _)) = prefix.rsplit_once('/') {
            dirs.insert(parent.to_string());
            prefix = parent;
        }
    }
    dirs
}

fn archive_error(path: &Path, source: ZipError) -> MaterializeError {
    MaterializeError::Archive {
        path: path.to_path_buf(),
        source,
    }
}
