//! Hierarchical lineage identifiers.
//!
//! An identifier looks like `prefix:5a3-f0`: an optional prefix (ignored), a
//! decimal root id naming the founding lineage, and a path of hexadecimal
//! branch tokens recording every split since the founder. Ancestry is prefix
//! containment of those paths.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{CladeError, Result};

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?s:.*:)?(\d+)((?s:.*))$").expect("identifier pattern"));

static BRANCH_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9a-f]+").expect("branch token pattern"));

/// Parsed lineage identifier.
///
/// Equality and hashing only consider the root id and the branch path; the
/// raw string is kept for display and as the census key.
#[derive(Debug, Clone)]
pub struct LineageId {
    raw: String,
    root_id: u64,
    path: Vec<String>,
}

impl LineageId {
    /// Parse an identifier string.
    pub fn parse(raw: &str) -> Result<Self> {
        let malformed = || CladeError::MalformedIdentifier(raw.to_string());

        let captures = IDENTIFIER.captures(raw).ok_or_else(malformed)?;
        let root_id = captures[1].parse::<u64>().map_err(|_| malformed())?;
        let path = BRANCH_TOKEN
            .find_iter(&captures[2])
            .map(|token| token.as_str().to_string())
            .collect();

        Ok(Self {
            raw: raw.to_string(),
            root_id,
            path,
        })
    }

    /// The string this identifier was parsed from.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Id of the founding lineage.
    pub fn root_id(&self) -> u64 {
        self.root_id
    }

    /// Branch tokens from the founder down to this lineage.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Number of branch tokens.
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// Whether both identifiers descend from the same founder.
    pub fn has_common_ancestor(&self, other: &LineageId) -> bool {
        self.root_id == other.root_id
    }

    /// Strict descent: `other`'s path is a proper prefix of this path.
    pub fn descends_from(&self, other: &LineageId) -> bool {
        self.has_common_ancestor(other)
            && other.path.len() < self.path.len()
            && self.path.starts_with(&other.path)
    }

    /// `other` is this lineage or one of its ancestors.
    pub fn is_direct_ancestor(&self, other: &LineageId) -> bool {
        self == other || self.descends_from(other)
    }

    /// One of the two is an ancestor of (or equal to) the other.
    pub fn is_direct_relative(&self, other: &LineageId) -> bool {
        self.is_direct_ancestor(other) || other.is_direct_ancestor(self)
    }

    /// Signed number of branch splits from `other` down to `self`.
    ///
    /// `None` unless the two are direct relatives.
    pub fn distance_from(&self, other: &LineageId) -> Option<isize> {
        self.is_direct_relative(other)
            .then(|| self.path.len() as isize - other.path.len() as isize)
    }
}

impl PartialEq for LineageId {
    fn eq(&self, other: &Self) -> bool {
        self.root_id == other.root_id && self.path == other.path
    }
}

impl Eq for LineageId {}

impl Hash for LineageId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.root_id.hash(state);
        self.path.hash(state);
    }
}

impl FromStr for LineageId {
    type Err = CladeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for LineageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> LineageId {
        LineageId::parse(raw).unwrap()
    }

    #[test]
    fn test_parse_root_and_path() {
        let lineage = id("12-3f-a0");
        assert_eq!(lineage.root_id(), 12);
        assert_eq!(lineage.path(), ["3f", "a0"]);
        assert_eq!(lineage.as_str(), "12-3f-a0");
    }

    #[test]
    fn test_parse_strips_prefix_up_to_last_colon() {
        let lineage = id("world:seed:7b");
        assert_eq!(lineage.root_id(), 7);
        assert_eq!(lineage.path(), ["b"]);
    }

    #[test]
    fn test_root_digits_are_greedy() {
        // Leading digits of the path are read as part of the root id.
        let lineage = id("51a");
        assert_eq!(lineage.root_id(), 51);
        assert_eq!(lineage.path(), ["a"]);
    }

    #[test]
    fn test_malformed_identifiers() {
        for raw in ["", "abc", "x:y5", ":"] {
            let err = LineageId::parse(raw).unwrap_err();
            assert!(
                matches!(err, CladeError::MalformedIdentifier(ref s) if s == raw),
                "{raw:?} should be malformed, got {err:?}"
            );
        }
    }

    #[test]
    fn test_equality_ignores_prefix_and_separators() {
        assert_eq!(id("p:5-a-b"), id("5a.b"));
        assert_ne!(id("5a"), id("6a"));
        assert_ne!(id("5a"), id("5ab"));
    }

    #[test]
    fn test_descends_from_is_strict_prefix() {
        assert!(id("5a-b").descends_from(&id("5a")));
        assert!(id("5a").descends_from(&id("5")));
        assert!(!id("5a").descends_from(&id("5a")), "irreflexive");
        assert!(!id("5a").descends_from(&id("5a-b")));
        assert!(!id("5b-a").descends_from(&id("5a")));
        assert!(!id("6a").descends_from(&id("6-b")));
        assert!(!id("7a").descends_from(&id("5")), "different founder");
    }

    #[test]
    fn test_descends_from_is_transitive() {
        let (a, b, c) = (id("3-1-2-3"), id("3-1-2"), id("3-1"));
        assert!(a.descends_from(&b) && b.descends_from(&c));
        assert!(a.descends_from(&c));
    }

    #[test]
    fn test_direct_ancestor_matches_definition() {
        let ids = ["5", "5a", "5a-b", "5b", "6", "5a-c"].map(id);
        for a in &ids {
            for b in &ids {
                assert_eq!(
                    a.is_direct_ancestor(b),
                    a == b || a.descends_from(b),
                    "{a} vs {b}"
                );
            }
        }
    }

    #[test]
    fn test_distance_is_defined_for_relatives_only() {
        let ids = ["5", "5a", "5a-b", "5b", "6", "5a-c"].map(id);
        for a in &ids {
            for b in &ids {
                let distance = a.distance_from(b);
                assert_eq!(distance.is_some(), a.is_direct_relative(b), "{a} vs {b}");
                if let Some(d) = distance {
                    assert_eq!(Some(-d), b.distance_from(a), "antisymmetry for {a}, {b}");
                }
            }
        }
        assert_eq!(id("5a-b").distance_from(&id("5")), Some(2));
        assert_eq!(id("5").distance_from(&id("5a-b")), Some(-2));
        assert_eq!(id("5a").distance_from(&id("5b")), None);
    }
}
