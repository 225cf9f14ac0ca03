//! Precedence resolution across the four artifact sources.
//!
//! For one logical artifact, the newest candidate is collected from each
//! source and the winner is picked by a fixed decision tree. The tree is
//! asymmetric; each row below is pinned by a test:
//!
//! | # | condition chain                                             | pick |
//! |---|-------------------------------------------------------------|------|
//! | 1 | `newest(p,s)=s`, `newest(s,r)=s`, `newest(s,a)=s`           | `s`  |
//! | 2 | `newest(p,s)=s`, `newest(s,r)=s`, `newest(s,a)≠s`           | `a`  |
//! | 3 | `newest(p,s)=s`, `newest(s,r)≠s`, `newest(r,a)=r`, hashes equal or `a` absent | `r` |
//! | 4 | `newest(p,s)=s`, `newest(s,r)≠s`, `newest(r,a)=r`, hashes differ or `r` absent | `a` |
//! | 5 | `newest(p,s)=s`, `newest(s,r)≠s`, `newest(r,a)≠r`           | `a`  |
//! | 6 | `newest(p,s)≠s`, `newest(p,r)=p`, `newest(p,a)=p`           | `p`  |
//! | 7 | `newest(p,s)≠s`, `newest(p,r)=p`, `newest(p,a)≠p`           | `a`  |
//! | 8 | `newest(p,s)≠s`, `newest(p,r)≠p`, `newest(r,a)=r`           | `r`  |
//! | 9 | `newest(p,s)≠s`, `newest(p,r)≠p`, `newest(r,a)≠r`           | `a`  |
//!
//! `p` = Overrides, `r` = Cached, `a` = Declared, `s` = Snapshots. Equality
//! is identity of the returned candidate, and two absent candidates are
//! equal. [`newest`] is left-biased, so ties go to the first operand.

use url::Url;

use crate::error::{RegistryError, Result};
use crate::registry::{RegistryEntry, Source, SourceRegistry};
use crate::version::newest;

/// The newest candidate from each source for one logical name.
#[derive(Debug, Clone, Copy, Default)]
pub struct Candidates<'a> {
    pub overrides: Option<&'a RegistryEntry>,
    pub cached: Option<&'a RegistryEntry>,
    pub declared: Option<&'a RegistryEntry>,
    pub snapshot: Option<&'a RegistryEntry>,
}

impl<'a> Candidates<'a> {
    /// Collect the newest matching entry from every source.
    pub fn collect(registry: &'a SourceRegistry, logical_name: &str) -> Result<Self> {
        Ok(Candidates {
            overrides: newest_of(registry, Source::Overrides, logical_name)?,
            cached: newest_of(registry, Source::Cached, logical_name)?,
            declared: newest_of(registry, Source::Declared, logical_name)?,
            snapshot: newest_of(registry, Source::Snapshots, logical_name)?,
        })
    }

    /// Whether no source has a candidate.
    pub fn is_empty(&self) -> bool {
        self.overrides.is_none()
            && self.cached.is_none()
            && self.declared.is_none()
            && self.snapshot.is_none()
    }

    /// Apply the decision tree.
    ///
    /// Returns the winning source and entry. Fails with
    /// [`RegistryError::NoCandidate`] when the tree lands on a source that
    /// has no candidate.
    pub fn decide(&self, logical_name: &str) -> Result<(Source, &'a RegistryEntry)> {
        let p = self.overrides;
        let r = self.cached;
        let a = self.declared;
        let s = self.snapshot;

        let (source, picked) = if same(newest(p, s)?, s) {
            if same(newest(s, r)?, s) {
                if same(newest(s, a)?, s) {
                    (Source::Snapshots, s)
                } else {
                    (Source::Declared, a)
                }
            } else if same(newest(r, a)?, r) {
                match (r, a) {
                    (Some(r), Some(a)) if r.hash != a.hash => (Source::Declared, Some(a)),
                    (Some(r), _) => (Source::Cached, Some(r)),
                    (None, _) => (Source::Declared, a),
                }
            } else {
                (Source::Declared, a)
            }
        } else if same(newest(p, r)?, p) {
            if same(newest(p, a)?, p) {
                (Source::Overrides, p)
            } else {
                (Source::Declared, a)
            }
        } else if same(newest(r, a)?, r) {
            (Source::Cached, r)
        } else {
            (Source::Declared, a)
        };

        picked
            .map(|entry| (source, entry))
            .ok_or_else(|| RegistryError::NoCandidate {
                logical_name: logical_name.to_string(),
            })
    }
}

/// Where an artifact should be obtained from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The winning source, or `None` when nothing matched and the fallback
    /// location was used.
    pub source: Option<Source>,
    /// The winning entry's filename, if any.
    pub name: Option<String>,
    /// Location to fetch from.
    pub location: Url,
}

/// Resolve the up-to-date location for a logical artifact name.
///
/// `fallback` is returned unchanged when no source has a candidate. The
/// registry is never modified.
pub fn resolve(registry: &SourceRegistry, logical_name: &str, fallback: &Url) -> Result<Resolution> {
    let candidates = Candidates::collect(registry, logical_name)?;
    if candidates.is_empty() {
        tracing::debug!("No candidates for {}, keeping {}", logical_name, fallback);
        return Ok(Resolution {
            source: None,
            name: None,
            location: fallback.clone(),
        });
    }

    let (source, entry) = candidates.decide(logical_name)?;
    tracing::debug!(
        "Resolved {} to {} {} at {}",
        logical_name,
        source,
        entry.name(),
        entry.location
    );
    Ok(Resolution {
        source: Some(source),
        name: Some(entry.name().to_string()),
        location: entry.location.clone(),
    })
}

fn newest_of<'a>(
    registry: &'a SourceRegistry,
    source: Source,
    logical_name: &str,
) -> Result<Option<&'a RegistryEntry>> {
    let mut best = None;
    for entry in registry.candidates(source, logical_name) {
        best = newest(Some(entry), best)?;
    }
    Ok(best)
}

fn same(x: Option<&RegistryEntry>, y: Option<&RegistryEntry>) -> bool {
    match (x, y) {
        (None, None) => true,
        (Some(x), Some(y)) => std::ptr::eq(x, y),
        _ => false,
    }
}
