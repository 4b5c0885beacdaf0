//! Semantic version bumping.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// BumpKind
// ============================================================================

/// Which component to increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BumpKind {
    Patch,
    Minor,
    Major,
}

impl BumpKind {
    /// Returns the lowercase name.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Patch => "patch",
            Self::Minor => "minor",
            Self::Major => "major",
        }
    }
}

impl fmt::Display for BumpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BumpKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "patch" => Ok(Self::Patch),
            "minor" => Ok(Self::Minor),
            "major" => Ok(Self::Major),
            other => Err(Error::version(format!("unknown bump kind: {other}"))),
        }
    }
}

// ============================================================================
// Version
// ============================================================================

/// A `major.minor.patch` triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    /// Creates a version.
    #[inline]
    #[must_use]
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Returns the next version for `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Version`] if the bumped component would overflow.
    pub fn bump(self, kind: BumpKind) -> Result<Self> {
        let next = |component: u64| {
            component
                .checked_add(1)
                .ok_or_else(|| Error::version(format!("cannot bump {kind} of {self}")))
        };

        Ok(match kind {
            BumpKind::Major => Self::new(next(self.major)?, 0, 0),
            BumpKind::Minor => Self::new(self.major, next(self.minor)?, 0),
            BumpKind::Patch => Self::new(self.major, self.minor, next(self.patch)?),
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = Error;

    /// Parses `x.y.z`, tolerating a leading `v`.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix('v').unwrap_or(trimmed);

        let parts: Vec<&str> = digits.split('.').collect();
        let [major, minor, patch] = parts.as_slice() else {
            return Err(Error::version(format!("expected x.y.z, got {s:?}")));
        };

        let component = |part: &str| {
            part.parse::<u64>()
                .map_err(|_| Error::version(format!("invalid version component {part:?} in {s:?}")))
        };

        Ok(Self::new(component(major)?, component(minor)?, component(patch)?))
    }
}

/// Bumps a version string.
///
/// # Errors
///
/// Returns [`Error::Version`] if `version` is not `x.y.z` or the bumped
/// component overflows.
///
/// # Example
///
/// ```
/// use maicraft_link::release::{BumpKind, increment_version};
///
/// assert_eq!(increment_version("1.2.3", BumpKind::Minor).unwrap(), "1.3.0");
/// ```
pub fn increment_version(version: &str, kind: BumpKind) -> Result<String> {
    Ok(version.parse::<Version>()?.bump(kind)?.to_string())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    #[test]
    fn test_increment_examples() {
        assert_eq!(increment_version("1.2.3", BumpKind::Patch).unwrap(), "1.2.4");
        assert_eq!(increment_version("1.2.3", BumpKind::Minor).unwrap(), "1.3.0");
        assert_eq!(increment_version("1.2.3", BumpKind::Major).unwrap(), "2.0.0");
    }

    #[test]
    fn test_leading_v() {
        assert_eq!(increment_version("v0.9.9", BumpKind::Patch).unwrap(), "0.9.10");
    }

    #[test]
    fn test_invalid_versions() {
        for bad in ["", "1.2", "1.2.3.4", "1.x.3", "-1.0.0", "1..3"] {
            assert!(
                matches!(increment_version(bad, BumpKind::Patch), Err(Error::Version { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_bump_overflow_is_an_error() {
        let max = u64::MAX;
        for (version, kind) in [
            (format!("{max}.0.0"), BumpKind::Major),
            (format!("1.{max}.0"), BumpKind::Minor),
            (format!("1.2.{max}"), BumpKind::Patch),
        ] {
            assert!(
                matches!(increment_version(&version, kind), Err(Error::Version { .. })),
                "{version} {kind}"
            );
        }

        // Only the bumped component matters.
        assert_eq!(
            increment_version(&format!("1.2.{max}"), BumpKind::Minor).unwrap(),
            "1.3.0"
        );
    }

    #[test]
    fn test_bump_kind_parse() {
        assert_eq!("minor".parse::<BumpKind>().unwrap(), BumpKind::Minor);
        assert!("info".parse::<BumpKind>().is_err());
        assert_eq!(BumpKind::Major.to_string(), "major");
    }

    proptest! {
        #[test]
        fn prop_bump_is_strictly_greater(
            major in 0u64..1000,
            minor in 0u64..1000,
            patch in 0u64..1000,
        ) {
            let v = Version::new(major, minor, patch);
            for kind in [BumpKind::Patch, BumpKind::Minor, BumpKind::Major] {
                prop_assert!(v.bump(kind).unwrap() > v);
            }
            prop_assert_eq!(v.to_string().parse::<Version>().unwrap(), v);
        }
    }
}
