//! # Dotted Paths
//!
//! `DottedPath` is the hashable, ordered form of a Python identifier such as
//! `numpy.ndarray.sum`.
//!
//! ## Ordering
//!
//! Paths with fewer components sort first; paths of equal length compare
//! component by component. This is the distance order used when assigning
//! canonical paths.
//!
//! ## Hash
//!
//! Each path carries a 64-bit non-cryptographic hash of its dotted form.
//! It is only a shortcut for equality checks; two paths are equal when their
//! components are equal. The empty path has no components and hash zero.

use crate::interner::Interner;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A dot-separated identifier.
///
/// Value semantics: a path is never mutated once built. Components may share
/// storage with other paths and with member names.
#[derive(Clone, Default)]
pub struct DottedPath {
    parts: Vec<Arc<str>>,
    hash: u64,
}

impl DottedPath {
    /// Parse a dotted string. Empty components are dropped.
    #[must_use]
    pub fn new(s: &str) -> Self {
        Self::from_shared(s.split('.').filter(|p| !p.is_empty()).map(Arc::from).collect())
    }

    /// Build a path from explicit components. Empty components are dropped.
    pub fn from_parts<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::from_shared(
            parts
                .into_iter()
                .filter(|p| !p.as_ref().is_empty())
                .map(|p| Arc::from(p.as_ref()))
                .collect(),
        )
    }

    /// Parse a dotted string, sharing components through `interner`.
    pub fn new_interned(s: &str, interner: &mut Interner) -> Self {
        Self::from_shared(
            s.split('.')
                .filter(|p| !p.is_empty())
                .map(|p| interner.intern(p))
                .collect(),
        )
    }

    /// The same path with its components moved into `interner`.
    #[must_use]
    pub fn interned(&self, interner: &mut Interner) -> Self {
        Self {
            parts: self.parts.iter().map(|p| interner.intern(p)).collect(),
            hash: self.hash,
        }
    }

    fn from_shared(parts: Vec<Arc<str>>) -> Self {
        let hash = hash_parts(&parts);
        Self { parts, hash }
    }

    /// Whether the path has no components.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Number of components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// The components, in order.
    #[must_use]
    pub fn parts(&self) -> &[Arc<str>] {
        &self.parts
    }

    /// Iterate over the components as string slices.
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.parts.iter().map(|p| p.as_ref())
    }

    /// The 64-bit hash of the dotted form (zero for the empty path).
    #[must_use]
    pub fn hash_value(&self) -> u64 {
        self.hash
    }

    /// First component, or `""` for the empty path.
    #[must_use]
    pub fn head(&self) -> &str {
        self.parts.first().map_or("", |p| p.as_ref())
    }

    /// Last component, or `""` for the empty path.
    #[must_use]
    pub fn last(&self) -> &str {
        self.parts.last().map_or("", |p| p.as_ref())
    }

    /// All but the last component; empty if there are fewer than two.
    #[must_use]
    pub fn predecessor(&self) -> Self {
        if self.parts.len() < 2 {
            return Self::default();
        }
        Self::from_shared(self.parts[..self.parts.len() - 1].to_vec())
    }

    /// A new path with `tail` appended.
    #[must_use]
    pub fn with_tail(&self, tail: &[&str]) -> Self {
        let mut parts = self.parts.clone();
        parts.extend(tail.iter().filter(|p| !p.is_empty()).map(|p| Arc::from(*p)));
        Self::from_shared(parts)
    }

    /// A new path with one already-shared component appended.
    #[must_use]
    pub fn child(&self, name: &Arc<str>) -> Self {
        let mut parts = Vec::with_capacity(self.parts.len() + 1);
        parts.extend(self.parts.iter().cloned());
        parts.push(Arc::clone(name));
        Self::from_shared(parts)
    }

    /// Whether the dotted form of this path starts with `prefix`.
    ///
    /// This is a string prefix test: `"os.pa"` is a prefix of `os.path`.
    /// No joined string is built.
    #[must_use]
    pub fn has_prefix(&self, prefix: &str) -> bool {
        let mut rest = prefix;
        for (i, part) in self.parts.iter().enumerate() {
            if rest.is_empty() {
                return true;
            }
            if i > 0 {
                match rest.strip_prefix('.') {
                    Some(r) => rest = r,
                    None => return false,
                }
            }
            if rest.len() <= part.len() {
                return part.starts_with(rest);
            }
            match rest.strip_prefix(part.as_ref()) {
                Some(r) => rest = r,
                None => return false,
            }
        }
        rest.is_empty()
    }

    /// Whether the dotted form of this path is exactly `s`.
    #[must_use]
    pub fn equals(&self, s: &str) -> bool {
        let mut rest = s;
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                match rest.strip_prefix('.') {
                    Some(r) => rest = r,
                    None => return false,
                }
            }
            match rest.strip_prefix(part.as_ref()) {
                Some(r) => rest = r,
                None => return false,
            }
        }
        rest.is_empty()
    }

    /// Whether `self` is a strict component-wise prefix of `other`.
    #[must_use]
    pub fn is_strict_prefix_of(&self, other: &DottedPath) -> bool {
        self.parts.len() < other.parts.len() && other.parts[..self.parts.len()] == self.parts[..]
    }
}

fn hash_parts(parts: &[Arc<str>]) -> u64 {
    if parts.is_empty() {
        return 0;
    }
    let mut hasher = DefaultHasher::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hasher.write_u8(b'.');
        }
        hasher.write(part.as_bytes());
    }
    hasher.finish()
}

// =============================================================================
// EQUALITY, ORDERING, HASHING
// =============================================================================

impl PartialEq for DottedPath {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.parts == other.parts
    }
}

impl Eq for DottedPath {}

impl Ord for DottedPath {
    fn cmp(&self, other: &Self) -> Ordering {
        self.parts
            .len()
            .cmp(&other.parts.len())
            .then_with(|| self.parts.cmp(&other.parts))
    }
}

impl PartialOrd for DottedPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for DottedPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

// =============================================================================
// FORMATTING & CONVERSION
// =============================================================================

impl fmt::Display for DottedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(part)?;
        }
        Ok(())
    }
}

impl fmt::Debug for DottedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DottedPath({:?})", self.to_string())
    }
}

impl From<&str> for DottedPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl Serialize for DottedPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DottedPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::new(&s))
    }
}

// =============================================================================
// TESTS
// =============================================================================
