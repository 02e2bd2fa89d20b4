//! Policy Version Value Object
//!
//! A policy version is a dot-separated list of non-negative integers
//! (`1`, `1.0`, `2.13.4`). Versions compare numerically segment by segment,
//! a missing trailing segment counting as `0`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{PapError, PapResult};

/// Segment delimiter
pub const VERSION_DELIMITER: char = '.';

/// Immutable, validated policy version
///
/// Segments carry no leading zeros, so a version has exactly one spelling,
/// which is also its file name. `1` and `1.0` are distinct versions. They compare equal numerically, and the
/// one with fewer segments sorts first to keep the order total.
#[derive(Debug, Clone)]
pub struct PolicyVersion {
    raw: String,
    segments: Vec<u64>,
}

impl PolicyVersion {
    /// Parse a version string
    pub fn parse(s: &str) -> PapResult<Self> {
        if s.is_empty() {
            return Err(invalid(s, "empty version"));
        }

        let segments = s
            .split(VERSION_DELIMITER)
            .map(|seg| {
                if seg.is_empty() {
                    return Err(invalid(s, "empty segment"));
                }
                if !seg.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid(s, &format!("non-numeric segment '{seg}'")));
                }
                // one spelling per version, so equal versions share a file name
                if seg.len() > 1 && seg.starts_with('0') {
                    return Err(invalid(s, &format!("leading zero in segment '{seg}'")));
                }
                seg.parse::<u64>()
                    .map_err(|e| invalid(s, &format!("segment '{seg}': {e}")))
            })
            .collect::<PapResult<Vec<_>>>()?;

        Ok(Self {
            raw: s.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[u64] {
        &self.segments
    }

    /// Numeric comparison only (`1` == `1.0`)
    pub fn cmp_numeric(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        for i in 0..len {
            let a = self.segments.get(i).copied().unwrap_or(0);
            let b = other.segments.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        Ordering::Equal
    }
}

fn invalid(version: &str, reason: &str) -> PapError {
    PapError::InvalidVersion {
        version: version.to_string(),
        reason: reason.to_string(),
    }
}

impl Ord for PolicyVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_numeric(other)
            .then_with(|| self.segments.len().cmp(&other.segments.len()))
    }
}

impl PartialOrd for PolicyVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Same segments means same spelling, since leading zeros are rejected.
impl PartialEq for PolicyVersion {
    fn eq(&self, other: &Self) -> bool {
        self.segments == other.segments
    }
}

impl Eq for PolicyVersion {}

impl std::hash::Hash for PolicyVersion {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.segments.hash(state);
    }
}

impl fmt::Display for PolicyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl FromStr for PolicyVersion {
    type Err = PapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for PolicyVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for PolicyVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
