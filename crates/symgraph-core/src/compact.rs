//! # Compactify
//!
//! Copy a chosen subset of a graph into a dense, owned array.
//!
//! References between nodes of the subset are rewritten to positions in
//! the new array. References leaving the subset keep pointing at the
//! original node, so a tool can keep "the part it cares about" without
//! copying the transitive closure.

use crate::graph::Graph;
use crate::path::DottedPath;
use crate::{Kind, NodeId, NodeRef};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Target of a reference inside a compacted node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CompactRef {
    /// Position in `Compacted::nodes`.
    Owned(usize),
    /// A node outside the subset, left in the source graph.
    Original(NodeRef),
}

/// A node copied out of its graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactNode {
    pub id: NodeId,
    pub canonical_name: DottedPath,
    pub kind: Kind,
    pub type_ref: Option<CompactRef>,
    pub members: BTreeMap<Arc<str>, Option<CompactRef>>,
    pub bases: Vec<Option<CompactRef>>,
}

/// The dense copy plus the old -> new mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Compacted {
    pub nodes: Vec<CompactNode>,
    pub mapping: BTreeMap<NodeRef, usize>,
}

impl Compacted {
    /// The copy of `node`, if it was part of the subset.
    #[must_use]
    pub fn get(&self, node: NodeRef) -> Option<&CompactNode> {
        self.mapping.get(&node).and_then(|&i| self.nodes.get(i))
    }

    /// Express `node` relative to this copy.
    #[must_use]
    pub fn rewrite(&self, node: NodeRef) -> CompactRef {
        self.mapping
            .get(&node)
            .map_or(CompactRef::Original(node), |&i| CompactRef::Owned(i))
    }
}

impl Graph {
    /// Copy `refs` into a dense array, in input order.
    ///
    /// A node listed twice is copied once, at its first position.
    ///
    /// # Panics
    ///
    /// If any entry of `refs` is not a node of this graph. That is a caller
    /// bug, not a data problem, and aborts the step.
    #[must_use]
    pub fn compactify(&self, refs: &[NodeRef]) -> Compacted {
        let arena = self.arena();
        let mut out = Compacted::default();

        for &r in refs {
            assert!(
                r.index() < arena.len(),
                "compactify given node {} outside arena of {}",
                r.index(),
                arena.len()
            );
            let next = out.mapping.len();
            out.mapping.entry(r).or_insert(next);
        }

        let mut order: Vec<(usize, NodeRef)> = out.mapping.iter().map(|(&r, &i)| (i, r)).collect();
        order.sort_unstable();

        let nodes = order
            .into_iter()
            .map(|(_, r)| {
                let node = &arena[r.index()];
                CompactNode {
                    id: node.id,
                    canonical_name: node.canonical_name.clone(),
                    kind: node.kind,
                    type_ref: node.type_ref.map(|t| out.rewrite(t)),
                    members: node
                        .members
                        .iter()
                        .map(|(name, target)| (Arc::clone(name), target.map(|t| out.rewrite(t))))
                        .collect(),
                    bases: node.bases.iter().map(|b| b.map(|b| out.rewrite(b))).collect(),
                }
            })
            .collect();
        out.nodes = nodes;
        out
    }
}

// =============================================================================
// TESTS
// =============================================================================
