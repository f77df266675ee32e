//! Game version ("patch") handling
//!
//! Matches carry a full version string like "14.24.638.2387". Only the
//! first two dot-separated components identify the patch; matches are
//! filtered and grouped by that pair. Comparison is numeric on
//! (major, minor), never lexicographic: "14.9" sorts before "14.10".

use std::fmt;
use std::str::FromStr;

/// Matches created before this timestamp carry corrupt or pre-release
/// creation times and are never usable as a patch boundary. Corresponds
/// to the public rollout of epoch timestamps in the match API
/// (2021-06-16T00:00:00Z).
pub const EARLIEST_VALID_TIMESTAMP: i64 = 1_623_801_600;

/// A two-component patch identifier extracted from a match's full version
/// string
///
/// Field order matters: the derived `Ord` compares major first, then minor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GameVersion {
    pub major: u32,
    pub minor: u32,
}

impl GameVersion {
    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Extracts the patch from a full version string
    ///
    /// Takes the first two dot-separated components and ignores the rest,
    /// so "14.24.638.2387" and "14.24" both parse to the same value.
    /// Returns None when either component is missing or non-numeric.
    pub fn from_full(version: &str) -> Option<Self> {
        let mut parts = version.split('.');
        let major = parts.next()?.trim().parse().ok()?;
        let minor = parts.next()?.trim().parse().ok()?;
        Some(Self { major, minor })
    }
}

impl FromStr for GameVersion {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_full(s).ok_or_else(|| format!("invalid version string: {s}"))
    }
}

impl fmt::Display for GameVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Selects the target patch from a set of sampled versions
///
/// Returns the numerically greatest (major, minor) pair. Ties are broken
/// by insertion order: the first occurrence of the winning version is the
/// one selected, since only a strictly greater candidate replaces the
/// current best. Returns None for an empty sample.
pub fn select_target_version(sampled: &[GameVersion]) -> Option<GameVersion> {
    let mut best: Option<GameVersion> = None;
    for version in sampled {
        match best {
            Some(current) if *version <= current => {}
            _ => best = Some(*version),
        }
    }
    best
}
