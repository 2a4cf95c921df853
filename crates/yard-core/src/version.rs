//! Three-part version numbers and release tags.
//!
//! A [`VersionId`] renders as `v<major>.<minor>.<patch>`. Release tags are
//! that text followed by [`TAG_SUFFIX`]; tags without the suffix belong to
//! somebody else and are ignored.
//!
//! # Examples
//!
//! ```
//! use yard_core::version::{Bump, VersionId};
//!
//! let v = VersionId::parse("v1.2.3");
//! assert_eq!(v.to_string(), "v1.2.3");
//! assert_eq!(v.bump(Bump::Patch).unwrap().to_tag(), "v1.2.4-yard");
//! assert_eq!(VersionId::parse("garbage"), VersionId::default());
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Literal suffix that marks a tag as a release made by this tool.
pub const TAG_SUFFIX: &str = "-yard";

/// A `major.minor.patch` version backed by [`semver::Version`].
///
/// Only the three numeric components are ever set, so ordering is semver
/// precedence, which for plain versions is lexicographic over the fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VersionId(semver::Version);

impl Default for VersionId {
    fn default() -> Self {
        Self::new(0, 0, 0)
    }
}

/// How many components a version string may have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// `v<major>` only.
    Major,
    /// `v<major>.<minor>.<patch>`.
    Full,
}

impl Arity {
    fn components(self) -> usize {
        match self {
            Arity::Major => 1,
            Arity::Full => 3,
        }
    }
}

/// Which component a release increments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bump {
    Major,
    Minor,
    Patch,
}

impl FromStr for Bump {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "major" | "maj" => Ok(Bump::Major),
            "minor" | "min" => Ok(Bump::Minor),
            "patch" | "fix" => Ok(Bump::Patch),
            _ => Err(Error::InvalidVersion {
                text: s.to_string(),
            }),
        }
    }
}

impl VersionId {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self(semver::Version::new(major, minor, patch))
    }

    pub fn major(&self) -> u64 {
        self.0.major
    }

    pub fn minor(&self) -> u64 {
        self.0.minor
    }

    pub fn patch(&self) -> u64 {
        self.0.patch
    }

    /// The underlying semantic version.
    pub fn as_semver(&self) -> &semver::Version {
        &self.0
    }

    /// Lenient parse: anything that is not a valid full version becomes `v0.0.0`.
    pub fn parse(text: &str) -> Self {
        components(text)
            .filter(|parts| parts.len() == 3)
            .map(|parts| Self::new(parts[0], parts[1], parts[2]))
            .unwrap_or_default()
    }

    /// Check `text` against the allowed arities.
    ///
    /// Every component must be a non-empty run of ASCII digits. A leading
    /// `v` is optional and `_` is accepted in place of `.`.
    pub fn validate(text: &str, allowed: &[Arity]) -> bool {
        match components(text) {
            Some(parts) => allowed.iter().any(|a| a.components() == parts.len()),
            None => false,
        }
    }

    /// Return the larger of two versions. On equality the right-hand side wins.
    ///
    /// Equal versions are indistinguishable by value, so the tie rule only
    /// matters to callers that track which argument they passed.
    pub fn bigger<'a>(lhs: &'a VersionId, rhs: &'a VersionId) -> &'a VersionId {
        if lhs > rhs { lhs } else { rhs }
    }

    /// The next version after applying `bump`.
    ///
    /// A component already at its maximum is an [`Error::InvalidVersion`].
    pub fn bump(&self, bump: Bump) -> Result<Self> {
        let overflow = || Error::InvalidVersion {
            text: format!("{self} cannot be bumped further"),
        };
        let (major, minor, patch) = (self.major(), self.minor(), self.patch());
        let next = match bump {
            Bump::Major => Self::new(major.checked_add(1).ok_or_else(overflow)?, 0, 0),
            Bump::Minor => Self::new(major, minor.checked_add(1).ok_or_else(overflow)?, 0),
            Bump::Patch => Self::new(major, minor, patch.checked_add(1).ok_or_else(overflow)?),
        };
        Ok(next)
    }

    /// Whether this is the placeholder version of a block never released.
    pub fn is_unreleased(&self) -> bool {
        *self == Self::default()
    }

    /// Release tag text for this version.
    pub fn to_tag(&self) -> String {
        format!("{self}{TAG_SUFFIX}")
    }

    /// Extract the version from a release tag; foreign or malformed tags give `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let text = tag.strip_suffix(TAG_SUFFIX)?;
        if !text.starts_with('v') || !Self::validate(text, &[Arity::Full]) {
            return None;
        }
        Some(Self::parse(text))
    }

    /// Suffix appended to identifiers of a pinned copy, e.g. `_v1_2_3`.
    pub fn identifier_suffix(&self) -> String {
        format!("_v{}_{}_{}", self.major(), self.minor(), self.patch())
    }

    /// Name of the major pointer directory, e.g. `v1`.
    pub fn major_label(&self) -> String {
        format!("v{}", self.major())
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}.{}", self.major(), self.minor(), self.patch())
    }
}

impl FromStr for VersionId {
    type Err = Error;

    /// Strict parse; malformed input is an error rather than `v0.0.0`.
    fn from_str(s: &str) -> Result<Self> {
        if !Self::validate(s, &[Arity::Full]) {
            return Err(Error::InvalidVersion {
                text: s.to_string(),
            });
        }
        Ok(Self::parse(s))
    }
}

/// Normalized text of a valid full version (`"1_02_3"` becomes `"v1.2.3"`).
pub fn normalize(text: &str) -> Option<String> {
    if !VersionId::validate(text, &[Arity::Full]) {
        return None;
    }
    Some(VersionId::parse(text).to_string())
}

/// Sort versions highest first. Stable, so duplicates keep their relative order.
pub fn sort_versions(mut versions: Vec<VersionId>) -> Vec<VersionId> {
    versions.sort_by(|a, b| b.cmp(a));
    versions
}

fn components(text: &str) -> Option<Vec<u64>> {
    let text = text.trim();
    let text = text.strip_prefix('v').unwrap_or(text);
    let standardized = text.replace('_', ".");
    standardized
        .split('.')
        .map(|part| {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            part.parse::<u64>().ok()
        })
        .collect()
}

/// A pinned snapshot label: an exact release or a major pointer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Pin {
    Exact(VersionId),
    Major(u64),
}

impl Pin {
    /// Parse a snapshot directory name such as `v1.2.3` or `v1`.
    pub fn parse(text: &str) -> Option<Self> {
        if !text.starts_with('v') {
            return None;
        }
        if VersionId::validate(text, &[Arity::Full]) {
            Some(Pin::Exact(VersionId::parse(text)))
        } else if VersionId::validate(text, &[Arity::Major]) {
            components(text).map(|parts| Pin::Major(parts[0]))
        } else {
            None
        }
    }

    /// Identifier suffix used by snapshots with this label.
    pub fn identifier_suffix(&self) -> String {
        match self {
            Pin::Exact(v) => v.identifier_suffix(),
            Pin::Major(major) => format!("_v{major}"),
        }
    }
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pin::Exact(v) => write!(f, "{v}"),
            Pin::Major(major) => write!(f, "v{major}"),
        }
    }
}
