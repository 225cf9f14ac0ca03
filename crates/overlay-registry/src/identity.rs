//! Artifact identity: splitting a filename into a short name and a version.
//!
//! `client-1.0.0.jar` parses to short name `client-.jar` and version
//! `1.0.0`. The short name is only ever used as a lookup key, so it is never
//! re-joined with the version.

use once_cell::sync::Lazy;
use regex::Regex;

/// Hyphen, a digit, then the longest run of non-alphabetic characters.
static VERSION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-\d[^a-zA-Z]*").expect("version pattern is valid"));

/// Archive extension used by every artifact source.
pub const ARCHIVE_EXTENSION: &str = ".jar";

/// The version-independent identity of an artifact filename.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    /// The filename as given.
    pub full_name: String,
    /// The filename with the version text removed.
    pub short_name: String,
    /// Dotted version text, if the filename carries one.
    pub version: Option<String>,
}

impl Identity {
    /// Parse an artifact filename.
    pub fn parse(full_name: &str) -> Self {
        match extract_version(full_name) {
            Some(version) => Identity {
                full_name: full_name.to_string(),
                short_name: full_name.replacen(version, "", 1),
                version: Some(version.to_string()),
            },
            None => Identity {
                full_name: full_name.to_string(),
                short_name: full_name.to_string(),
                version: None,
            },
        }
    }

    /// The key override groups and reconciliation use to decide that two
    /// artifacts are the same logical artifact.
    ///
    /// Strips the archive extension and any trailing separators left behind
    /// by version removal, so `ui-fix-2.0.jar`, `ui-fix.jar` and a group
    /// directory named `ui-fix` all share the key `ui-fix`.
    pub fn logical_name(&self) -> &str {
        let stem = self
            .short_name
            .strip_suffix(ARCHIVE_EXTENSION)
            .unwrap_or(&self.short_name);
        stem.trim_end_matches(['-', '.', '_'])
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.version {
            Some(v) => write!(f, "{} ({})", self.short_name, v),
            None => write!(f, "{}", self.short_name),
        }
    }
}

/// Find the version text in a filename.
///
/// The match includes the leading hyphen and whatever separator follows the
/// last digit (usually the `.` before the extension); both are dropped.
fn extract_version(name: &str) -> Option<&str> {
    let m = VERSION_PATTERN.find(name)?;
    let inner = &m.as_str()[1..];
    Some(inner.trim_end_matches(|c: char| !c.is_ascii_digit()))
}
