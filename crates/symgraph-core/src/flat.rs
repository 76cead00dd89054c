//! # Flat Representation
//!
//! The acyclic, id-indirected form of the node graph used for persistence
//! and for moving graphs between processes.
//!
//! - `flatten` turns arena nodes into `FlatNode` records, replacing every
//!   reference with a `NodeId`.
//! - `Inflater` turns records from one or more sources back into a
//!   `GraphBuilder`: one node per record first, then a second pass that
//!   resolves ids through the shared id table.

use crate::builder::GraphBuilder;
use crate::graph::Graph;
use crate::interner::Interner;
use crate::node::Node;
use crate::path::DottedPath;
use crate::{Kind, NodeId, NodeRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

// =============================================================================
// RECORDS
// =============================================================================

/// One attribute of a flat record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatMember {
    pub attr: String,
    /// `None` for an unresolved attribute.
    pub node_id: Option<NodeId>,
}

/// One node with its references replaced by ids.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FlatNode {
    pub id: NodeId,
    #[serde(default)]
    pub canonical_name: DottedPath,
    #[serde(default)]
    pub classification: Kind,
    #[serde(default)]
    pub type_id: Option<NodeId>,
    /// Members in attribute-name order.
    #[serde(default)]
    pub members: Vec<FlatMember>,
    #[serde(default)]
    pub base_ids: Vec<Option<NodeId>>,
}

// =============================================================================
// FLATTEN
// =============================================================================

/// Hands out ids: a node's own id if it has one, otherwise the next unused.
///
/// When several nodes carry the same id (a duplicate overwritten during
/// inflate), only the last of them in the arena keeps it, matching the id
/// index of a published graph. The others get fresh ids so no two records
/// share one.
struct IdAssigner<'a> {
    nodes: &'a [Node],
    owners: BTreeMap<NodeId, NodeRef>,
    assigned: BTreeMap<NodeRef, NodeId>,
    next: u64,
}

impl<'a> IdAssigner<'a> {
    fn new(nodes: &'a [Node]) -> Self {
        let max = nodes.iter().map(|n| n.id.0).max().unwrap_or(0);
        let owners = nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.id.is_assigned())
            .map(|(index, n)| (n.id, NodeRef::new(index)))
            .collect();
        Self {
            nodes,
            owners,
            assigned: BTreeMap::new(),
            next: max.saturating_add(1),
        }
    }

    fn id(&mut self, node: NodeRef) -> NodeId {
        if let Some(&id) = self.assigned.get(&node) {
            return id;
        }
        let own = self
            .nodes
            .get(node.index())
            .map_or(NodeId::UNASSIGNED, |n| n.id);
        let id = if own.is_assigned() && self.owners.get(&own) == Some(&node) {
            own
        } else {
            let id = NodeId(self.next);
            self.next = self.next.saturating_add(1);
            id
        };
        self.assigned.insert(node, id);
        id
    }
}

/// Flatten `refs` out of `nodes`.
///
/// References to nodes outside `refs` get an id (synthetic if needed) but no
/// record of their own.
fn flatten_arena(nodes: &[Node], refs: &[NodeRef]) -> Vec<FlatNode> {
    let mut ids = IdAssigner::new(nodes);
    // ids of the requested nodes come first so they are stable per input order
    for &r in refs {
        ids.id(r);
    }

    refs.iter()
        .filter_map(|&r| nodes.get(r.index()).map(|node| (r, node)))
        .map(|(r, node)| FlatNode {
            id: ids.id(r),
            canonical_name: node.canonical_name.clone(),
            classification: node.kind,
            type_id: node.type_ref.map(|t| ids.id(t)),
            members: node
                .members
                .iter()
                .map(|(name, target)| FlatMember {
                    attr: name.to_string(),
                    node_id: target.map(|t| ids.id(t)),
                })
                .collect(),
            base_ids: node.bases.iter().map(|b| b.map(|b| ids.id(b))).collect(),
        })
        .collect()
}

impl Graph {
    /// Flatten the given nodes.
    #[must_use]
    pub fn flatten(&self, refs: &[NodeRef]) -> Vec<FlatNode> {
        flatten_arena(self.arena(), refs)
    }

    /// Flatten every node except the root, sorted by id.
    #[must_use]
    pub fn flatten_all(&self) -> Vec<FlatNode> {
        let refs: Vec<NodeRef> = self.nodes().map(|n| n.node_ref()).collect();
        let mut flat = self.flatten(&refs);
        flat.sort_by_key(|n| n.id);
        flat
    }

    /// Inflate `flat` and publish it.
    #[must_use]
    pub fn from_flat(flat: &[FlatNode], interner: &mut Interner) -> Self {
        GraphBuilder::from_flat(flat, interner).build()
    }
}

impl GraphBuilder {
    /// Flatten the given nodes of the builder.
    #[must_use]
    pub fn flatten(&self, refs: &[NodeRef]) -> Vec<FlatNode> {
        flatten_arena(self.arena(), refs)
    }

    /// Inflate one flat source into a fresh builder.
    #[must_use]
    pub fn from_flat(flat: &[FlatNode], interner: &mut Interner) -> Self {
        let mut inflater = Inflater::new(interner);
        inflater.add_source(flat);
        inflater.finish()
    }
}

// =============================================================================
// INFLATE
// =============================================================================

struct Pending {
    node: NodeRef,
    type_id: Option<NodeId>,
    members: Vec<(Arc<str>, Option<NodeId>)>,
    base_ids: Vec<Option<NodeId>>,
}

/// Inflates flat records from any number of sources into one builder.
///
/// Ids are shared across sources; a later record with an id already seen
/// takes over that id. References are resolved in `finish`, so a source may
/// refer to nodes of a source added after it.
pub struct Inflater<'i> {
    interner: &'i mut Interner,
    builder: GraphBuilder,
    table: BTreeMap<NodeId, NodeRef>,
    pending: Vec<Pending>,
    duplicates: usize,
}

impl<'i> Inflater<'i> {
    /// Start an empty load.
    pub fn new(interner: &'i mut Interner) -> Self {
        Self::extend(GraphBuilder::new(), interner)
    }

    /// Continue loading into an existing builder. Its nodes with assigned
    /// ids seed the id table.
    pub fn extend(builder: GraphBuilder, interner: &'i mut Interner) -> Self {
        let table = builder
            .nodes()
            .filter(|(_, node)| node.id.is_assigned())
            .map(|(r, node)| (node.id, r))
            .collect();
        Self {
            interner,
            builder,
            table,
            pending: Vec::new(),
            duplicates: 0,
        }
    }

    /// The id table built so far.
    #[must_use]
    pub fn table(&self) -> &BTreeMap<NodeId, NodeRef> {
        &self.table
    }

    /// Allocate one node per record of `flat`.
    pub fn add_source(&mut self, flat: &[FlatNode]) {
        for record in flat {
            let canonical_name = record.canonical_name.interned(self.interner);
            let node = self
                .builder
                .add_node(record.id, canonical_name, record.classification);

            if record.id.is_assigned() {
                if let Some(previous) = self.table.insert(record.id, node) {
                    self.duplicates += 1;
                    tracing::warn!(
                        id = record.id.0,
                        previous = previous.index(),
                        replacement = node.index(),
                        "duplicate node id, keeping the later record"
                    );
                }
            }

            let mut members = Vec::with_capacity(record.members.len());
            for m in &record.members {
                if m.attr.is_empty() {
                    tracing::warn!(id = record.id.0, "skipping member with an empty name");
                    continue;
                }
                members.push((self.interner.intern(&m.attr), m.node_id));
            }
            self.pending.push(Pending {
                node,
                type_id: record.type_id,
                members,
                base_ids: record.base_ids.clone(),
            });
        }
    }

    /// Resolve every pending reference and hand back the builder.
    ///
    /// Ids with no record resolve to `None`.
    #[must_use]
    pub fn finish(self) -> GraphBuilder {
        let Self {
            mut builder,
            table,
            pending,
            duplicates,
            ..
        } = self;

        let mut dangling = 0usize;
        let mut resolve = |id: Option<NodeId>| -> Option<NodeRef> {
            let id = id?;
            let found = table.get(&id).copied();
            if found.is_none() {
                dangling += 1;
                tracing::debug!(id = id.0, "dangling reference resolved to nil");
            }
            found
        };

        for entry in pending {
            let ty = resolve(entry.type_id);
            builder.set_type(entry.node, ty);
            for (name, id) in entry.members {
                let target = resolve(id);
                builder.set_member(entry.node, name, target);
            }
            for id in entry.base_ids {
                let base = resolve(id);
                builder.add_base(entry.node, base);
            }
        }

        tracing::debug!(
            nodes = builder.len(),
            ids = table.len(),
            duplicates,
            dangling,
            "flat records inflated"
        );
        builder
    }
}

// =============================================================================
// TESTS
// =============================================================================
