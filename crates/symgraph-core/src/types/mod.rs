//! # Core Type Definitions
//!
//! This module contains the small value types shared by every other module:
//! - Node identifiers (`NodeId` for the persisted identity, `NodeRef` for the arena slot)
//! - The node classification tag (`Kind`)
//! - Error types (`SymGraphError`)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Persisted identity of a node.
///
/// Stable across reloads of the same dataset. `NodeId::UNASSIGNED` (zero)
/// marks nodes that were never given an identity by their producer, such as
/// the synthetic root or nodes created while linking.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct NodeId(pub u64);

impl NodeId {
    /// The identity of a node that has none.
    pub const UNASSIGNED: Self = Self(0);

    /// Whether this id was assigned by a producer.
    #[must_use]
    pub const fn is_assigned(self) -> bool {
        self.0 != 0
    }
}

/// Index of a node inside a graph's arena.
///
/// Only meaningful for the graph (or builder) that handed it out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeRef(pub(crate) u32);

impl NodeRef {
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    /// Position in the arena.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

// =============================================================================
// KIND
// =============================================================================

/// Classification of a node.
///
/// The numeric values are a wire contract shared with previously persisted
/// datasets and must never be renumbered.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum Kind {
    #[default]
    None = 0,
    Function = 1,
    Type = 2,
    Module = 3,
    Descriptor = 4,
    Object = 5,
    Root = 6,
}

impl Kind {
    /// Every kind, in wire order.
    pub const ALL: [Kind; 7] = [
        Kind::None,
        Kind::Function,
        Kind::Type,
        Kind::Module,
        Kind::Descriptor,
        Kind::Object,
        Kind::Root,
    ];

    /// Lowercase name used by the explorer pipeline.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Kind::None => "none",
            Kind::Function => "function",
            Kind::Type => "type",
            Kind::Module => "module",
            Kind::Descriptor => "descriptor",
            Kind::Object => "object",
            Kind::Root => "root",
        }
    }
}

impl From<Kind> for u8 {
    fn from(kind: Kind) -> Self {
        kind as u8
    }
}

impl TryFrom<u8> for Kind {
    type Error = SymGraphError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Kind::ALL
            .get(value as usize)
            .copied()
            .ok_or(SymGraphError::UnknownKind(value))
    }
}

impl FromStr for Kind {
    type Err = SymGraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Kind::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| SymGraphError::UnknownKindName(s.to_string()))
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the symgraph engine.
///
/// Producer bugs (a dangling arena reference handed to `compactify`, for
/// example) are not represented here: they abort the current step.
#[derive(Debug, Error)]
pub enum SymGraphError {
    /// A component of a dotted identifier does not exist where expected.
    #[error("failed to find {component} component in {ident}")]
    NotFound { component: String, ident: String },

    /// The component exists but its target node is unresolved.
    #[error("node for {component} in {ident} was nil")]
    NilMember { component: String, ident: String },

    /// A classification byte outside the wire contract.
    #[error("unknown classification value: {0}")]
    UnknownKind(u8),

    /// A classification name the explorer pipeline never emits.
    #[error("unrecognized classification: '{0}'")]
    UnknownKindName(String),

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A deserialization error occurred.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

impl SymGraphError {
    pub(crate) fn not_found(component: &str, ident: &str) -> Self {
        Self::NotFound {
            component: component.to_string(),
            ident: ident.to_string(),
        }
    }

    pub(crate) fn nil_member(component: &str, ident: &str) -> Self {
        Self::NilMember {
            component: component.to_string(),
            ident: ident.to_string(),
        }
    }

    /// Whether this is a lookup miss (as opposed to a format or I/O failure).
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::NilMember { .. })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_wire_values_are_stable() {
        assert_eq!(u8::from(Kind::None), 0);
        assert_eq!(u8::from(Kind::Function), 1);
        assert_eq!(u8::from(Kind::Type), 2);
        assert_eq!(u8::from(Kind::Module), 3);
        assert_eq!(u8::from(Kind::Descriptor), 4);
        assert_eq!(u8::from(Kind::Object), 5);
        assert_eq!(u8::from(Kind::Root), 6);
    }

    #[test]
    fn kind_from_wire() {
        for kind in Kind::ALL {
            assert_eq!(Kind::try_from(u8::from(kind)).expect("decode"), kind);
        }
        assert!(matches!(
            Kind::try_from(7),
            Err(SymGraphError::UnknownKind(7))
        ));
    }

    #[test]
    fn kind_names() {
        assert_eq!("descriptor".parse::<Kind>().expect("parse"), Kind::Descriptor);
        assert_eq!(Kind::Type.to_string(), "type");
        assert!("class".parse::<Kind>().is_err());
    }

    #[test]
    fn unassigned_id() {
        assert!(!NodeId::UNASSIGNED.is_assigned());
        assert!(NodeId(7).is_assigned());
    }

    #[test]
    fn not_found_message_names_component() {
        let err = SymGraphError::not_found("sys", "sys.path");
        assert_eq!(err.to_string(), "failed to find sys component in sys.path");
        assert!(err.is_not_found());
    }
}
