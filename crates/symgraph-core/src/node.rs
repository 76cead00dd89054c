//! # Nodes and Attribute Resolution
//!
//! A `Node` is one symbol: a package, module, type, function, descriptor or
//! plain object. Nodes live in the arena owned by a `Graph` (or a
//! `GraphBuilder`) and refer to each other by `NodeRef`, so the cycles that
//! Python data is full of (a type whose method's type points back at a
//! types-module type) never turn into ownership cycles.
//!
//! ## Resolution Rules
//!
//! `attr(name)` follows Python attribute lookup:
//! 1. the node's own `members`;
//! 2. then its `type_ref`, unless that is the node itself;
//! 3. then each non-nil base, skipping the node itself.
//!
//! Resolution gives up past `MAX_ATTR_DEPTH` links and reports "not found".
//! Callers cannot tell that apart from a genuinely missing attribute.

use crate::graph::Graph;
use crate::path::DottedPath;
use crate::primitives::MAX_ATTR_DEPTH;
use crate::{Kind, NodeId, NodeRef};
use std::collections::BTreeMap;
use std::sync::Arc;

// =============================================================================
// NODE
// =============================================================================

/// A single entry of the symbol graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Node {
    /// Persisted identity (`NodeId::UNASSIGNED` if the producer gave none).
    pub id: NodeId,
    /// Name the producer asserts as authoritative. May be empty, and may
    /// turn out not to resolve back to this node.
    pub canonical_name: DottedPath,
    /// Classification tag.
    pub kind: Kind,
    /// The node describing this node's type. May be the node itself.
    pub type_ref: Option<NodeRef>,
    /// Attribute name -> target. `None` is an attribute whose target was
    /// never resolved.
    pub members: BTreeMap<Arc<str>, Option<NodeRef>>,
    /// Base classes, in order. Only meaningful for `Kind::Type`; `None`
    /// entries are unresolved bases.
    pub bases: Vec<Option<NodeRef>>,
}

impl Node {
    /// Create a node with no type, members or bases.
    #[must_use]
    pub fn new(id: NodeId, canonical_name: DottedPath, kind: Kind) -> Self {
        Self {
            id,
            canonical_name,
            kind,
            ..Self::default()
        }
    }

    /// Whether `name` is one of this node's own members (inherited
    /// attributes are not considered).
    #[must_use]
    pub fn has_member(&self, name: &str) -> bool {
        self.members.contains_key(name)
    }
}

// =============================================================================
// RESOLUTION OVER AN ARENA
// =============================================================================

/// Look up `name` on `start`.
///
/// Outer `None`: not found (or depth exceeded). `Some(None)`: found, but the
/// attribute's target is unresolved.
pub(crate) fn lookup_attr(
    nodes: &[Node],
    start: NodeRef,
    name: &str,
    depth: usize,
) -> Option<Option<NodeRef>> {
    if depth > MAX_ATTR_DEPTH {
        return None;
    }
    let node = nodes.get(start.index())?;

    if let Some(target) = node.members.get(name) {
        return Some(*target);
    }

    if let Some(ty) = node.type_ref.filter(|&t| t != start) {
        if let Some(found) = lookup_attr(nodes, ty, name, depth + 1) {
            return Some(found);
        }
    }

    node.bases
        .iter()
        .flatten()
        .filter(|&&base| base != start)
        .find_map(|&base| lookup_attr(nodes, base, name, depth + 1))
}

/// Gather every attribute visible on `start` into `out`.
///
/// Own members take precedence over the type's, which take precedence over
/// the bases'.
fn collect_attrs<'g>(
    nodes: &'g [Node],
    start: NodeRef,
    depth: usize,
    out: &mut BTreeMap<&'g str, Option<NodeRef>>,
) {
    if depth > MAX_ATTR_DEPTH {
        return;
    }
    let Some(node) = nodes.get(start.index()) else {
        return;
    };

    for (name, target) in &node.members {
        out.entry(name.as_ref()).or_insert(*target);
    }

    if let Some(ty) = node.type_ref.filter(|&t| t != start) {
        collect_attrs(nodes, ty, depth + 1, out);
    }

    for &base in node.bases.iter().flatten() {
        if base != start {
            collect_attrs(nodes, base, depth + 1, out);
        }
    }
}

fn unresolved_base(nodes: &[Node], start: NodeRef, depth: usize) -> bool {
    if depth > MAX_ATTR_DEPTH {
        return false;
    }
    let Some(node) = nodes.get(start.index()) else {
        return false;
    };

    if node.kind == Kind::Type && node.bases.iter().any(Option::is_none) {
        return true;
    }

    match node.type_ref {
        Some(ty) if ty != start => unresolved_base(nodes, ty, depth + 1),
        _ => false,
    }
}

// =============================================================================
// NODE VIEW
// =============================================================================

/// A borrowed handle on one node of a published `Graph`.
///
/// Cheap to copy; every accessor resolves references through the graph.
#[derive(Clone, Copy)]
pub struct NodeView<'g> {
    graph: &'g Graph,
    node: NodeRef,
}

impl<'g> NodeView<'g> {
    pub(crate) fn new(graph: &'g Graph, node: NodeRef) -> Self {
        Self { graph, node }
    }

    fn data(&self) -> &'g Node {
        &self.graph.arena()[self.node.index()]
    }

    fn view(&self, node: NodeRef) -> NodeView<'g> {
        NodeView::new(self.graph, node)
    }

    /// Arena handle; the node's identity within this graph.
    #[must_use]
    pub fn node_ref(&self) -> NodeRef {
        self.node
    }

    /// The underlying node record.
    #[must_use]
    pub fn node(&self) -> &'g Node {
        self.data()
    }

    #[must_use]
    pub fn id(&self) -> NodeId {
        self.data().id
    }

    #[must_use]
    pub fn kind(&self) -> Kind {
        self.data().kind
    }

    #[must_use]
    pub fn canonical_name(&self) -> &'g DottedPath {
        &self.data().canonical_name
    }

    /// The canonical path computed for this node, if it is reachable.
    #[must_use]
    pub fn any_path(&self) -> Option<&'g DottedPath> {
        self.graph.any_path(self.node)
    }

    /// The node's type, if it has one.
    #[must_use]
    pub fn type_node(&self) -> Option<NodeView<'g>> {
        self.data().type_ref.map(|t| self.view(t))
    }

    /// Own members, in name order. Unresolved members yield `None`.
    pub fn members(&self) -> impl Iterator<Item = (&'g str, Option<NodeView<'g>>)> + 'g {
        let this = *self;
        self.data()
            .members
            .iter()
            .map(move |(name, target)| (name.as_ref(), target.map(|t| this.view(t))))
    }

    /// Own member `name`, if present and resolved.
    #[must_use]
    pub fn member(&self, name: &str) -> Option<NodeView<'g>> {
        self.data()
            .members
            .get(name)
            .copied()
            .flatten()
            .map(|t| self.view(t))
    }

    /// Base classes in declaration order. Unresolved bases yield `None`.
    pub fn bases(&self) -> impl Iterator<Item = Option<NodeView<'g>>> + 'g {
        let this = *self;
        self.data()
            .bases
            .iter()
            .map(move |base| base.map(|b| this.view(b)))
    }

    #[must_use]
    pub fn has_member(&self, name: &str) -> bool {
        self.data().has_member(name)
    }

    /// Python-style attribute lookup through members, type and bases.
    ///
    /// Returns `None` when the attribute is missing, when its target is
    /// unresolved, or when resolution exceeds `MAX_ATTR_DEPTH`.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<NodeView<'g>> {
        lookup_attr(self.graph.arena(), self.node, name, 0)
            .flatten()
            .map(|t| self.view(t))
    }

    /// Names of every attribute `attr` could resolve, sorted and unique.
    #[must_use]
    pub fn attrs(&self) -> Vec<&'g str> {
        let mut out = BTreeMap::new();
        collect_attrs(self.graph.arena(), self.node, 0, &mut out);
        out.into_keys().collect()
    }

    /// `attrs`, grouped by the kind of the node each attribute refers to.
    ///
    /// Attributes with an unresolved target are grouped under `Kind::None`.
    #[must_use]
    pub fn attrs_by_kind(&self) -> BTreeMap<Kind, Vec<&'g str>> {
        let nodes = self.graph.arena();
        let mut out = BTreeMap::new();
        collect_attrs(nodes, self.node, 0, &mut out);

        let mut grouped: BTreeMap<Kind, Vec<&'g str>> = BTreeMap::new();
        for (name, target) in out {
            let kind = target
                .and_then(|t| nodes.get(t.index()))
                .map_or(Kind::None, |n| n.kind);
            grouped.entry(kind).or_default().push(name);
        }
        grouped
    }

    /// True for a type with at least one unresolved base, or for a node
    /// whose type (other than itself) has one.
    #[must_use]
    pub fn has_unresolved_base(&self) -> bool {
        unresolved_base(self.graph.arena(), self.node, 0)
    }
}

impl PartialEq for NodeView<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.graph, other.graph) && self.node == other.node
    }
}

impl Eq for NodeView<'_> {}

impl std::fmt::Debug for NodeView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeView")
            .field("node", &self.node)
            .field("id", &self.id())
            .field("kind", &self.kind())
            .field("canonical_name", self.canonical_name())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
