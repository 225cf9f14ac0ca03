//! Version comparison over artifact identities.
//!
//! Versions are dotted integer strings compared component by component
//! after zero-padding the shorter one, so `1.10.0` is newer than `1.2.0`
//! and `1.2` equals `1.2.0`.

use std::cmp::Ordering;

use crate::error::{RegistryError, Result};
use crate::identity::Identity;

/// Compare two dotted version strings numerically.
///
/// `name` is only used for error reporting. A component that is not an
/// integer is an error; it is never treated as zero.
pub fn compare_versions(name: &str, a: &str, b: &str) -> Result<Ordering> {
    let left = parse_components(name, a)?;
    let right = parse_components(name, b)?;
    let len = left.len().max(right.len());
    for i in 0..len {
        let l = left.get(i).copied().unwrap_or(0);
        let r = right.get(i).copied().unwrap_or(0);
        match l.cmp(&r) {
            Ordering::Equal => continue,
            other => return Ok(other),
        }
    }
    Ok(Ordering::Equal)
}

fn parse_components(name: &str, version: &str) -> Result<Vec<u64>> {
    version
        .split('.')
        .map(|component| {
            component
                .parse::<u64>()
                .map_err(|_| RegistryError::InvalidVersion {
                    name: name.to_string(),
                    version: version.to_string(),
                    component: component.to_string(),
                })
        })
        .collect()
}

/// Pick the newer of two optional candidates.
///
/// Left-biased: when neither side has a version, or both versions are
/// equal, `a` is returned (even if `a` is absent). A versioned candidate
/// always beats an unversioned or absent one.
pub fn newest<'a, T: AsRef<Identity>>(
    a: Option<&'a T>,
    b: Option<&'a T>,
) -> Result<Option<&'a T>> {
    let va = a.and_then(|x| x.as_ref().version.as_deref());
    let vb = b.and_then(|x| x.as_ref().version.as_deref());
    match (va, vb) {
        (None, None) | (Some(_), None) => Ok(a),
        (None, Some(_)) => Ok(b),
        (Some(va), Some(vb)) => {
            let name = a.map(|x| x.as_ref().full_name.as_str()).unwrap_or_default();
            match compare_versions(name, va, vb)? {
                Ordering::Less => Ok(b),
                Ordering::Equal | Ordering::Greater => Ok(a),
            }
        }
    }
}

impl AsRef<Identity> for Identity {
    fn as_ref(&self) -> &Identity {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> Identity {
        Identity::parse(name)
    }

    fn is<T>(picked: Option<&T>, expected: &T) -> bool {
        picked.is_some_and(|p| std::ptr::eq(p, expected))
    }

    #[test]
    fn numeric_not_lexicographic() {
        let old = id("lib-1.2.0.jar");
        let new = id("lib-1.10.0.jar");
        assert!(is(newest(Some(&old), Some(&new)).unwrap(), &new));
        assert!(is(newest(Some(&new), Some(&old)).unwrap(), &new));
    }

    #[test]
    fn equal_versions_return_first_operand() {
        let a = id("lib-2.0.jar");
        let b = id("lib-2.0.0.jar");
        assert!(is(newest(Some(&a), Some(&b)).unwrap(), &a));
        assert!(is(newest(Some(&b), Some(&a)).unwrap(), &b));
    }

    #[test]
    fn versioned_beats_unversioned_in_both_orders() {
        let versioned = id("lib-0.1.jar");
        let bare = id("lib.jar");
        assert!(is(newest(Some(&versioned), Some(&bare)).unwrap(), &versioned));
        assert!(is(newest(Some(&bare), Some(&versioned)).unwrap(), &versioned));
        assert!(is(newest(None, Some(&versioned)).unwrap(), &versioned));
        assert!(is(newest(Some(&versioned), None).unwrap(), &versioned));
    }

    #[test]
    fn unversioned_tie_is_left_biased() {
        let a = id("lib.jar");
        let b = id("lib.jar");
        assert!(is(newest(Some(&a), Some(&b)).unwrap(), &a));
        // An absent left operand still wins a tie against an unversioned right one.
        assert!(newest(None, Some(&b)).unwrap().is_none());
        assert!(newest::<Identity>(None, None).unwrap().is_none());
    }

    #[test]
    fn shorter_version_is_zero_padded() {
        assert_eq!(compare_versions("x", "1.2", "1.2.0").unwrap(), Ordering::Equal);
        assert_eq!(compare_versions("x", "1.2", "1.2.1").unwrap(), Ordering::Less);
        assert_eq!(compare_versions("x", "2", "1.9.9").unwrap(), Ordering::Greater);
    }

    #[test]
    fn non_integer_component_is_fatal() {
        let err = compare_versions("lib-1..2.jar", "1..2", "1.0").unwrap_err();
        assert!(matches!(err, RegistryError::InvalidVersion { ref component, .. } if component.is_empty()));

        let a = id("lib-1-2.jar");
        let b = id("lib-1.0.jar");
        assert_eq!(a.version.as_deref(), Some("1-2"));
        assert!(newest(Some(&a), Some(&b)).is_err());
    }
}
