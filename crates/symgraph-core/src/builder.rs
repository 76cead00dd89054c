//! # Graph Builder
//!
//! The only mutable form of a symbol graph. Loaders, linkers and tests add
//! nodes and wire their references here, then call `build` to publish an
//! immutable `Graph`.

use crate::graph::Graph;
use crate::node::Node;
use crate::path::DottedPath;
use crate::{Kind, NodeId, NodeRef};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Accumulates nodes before publication.
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    nodes: Vec<Node>,

    /// Single-component canonical name -> node, last writer wins
    packages: BTreeMap<Arc<str>, NodeRef>,
}

impl GraphBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_nodes(nodes: Vec<Node>) -> Self {
        let mut builder = Self {
            nodes: Vec::with_capacity(nodes.len()),
            packages: BTreeMap::new(),
        };
        for node in nodes {
            builder.add(node);
        }
        builder
    }

    /// Number of nodes added so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The node at `node`, if it was handed out by this builder.
    #[must_use]
    pub fn get(&self, node: NodeRef) -> Option<&Node> {
        self.nodes.get(node.index())
    }

    pub(crate) fn arena(&self) -> &[Node] {
        &self.nodes
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeRef, &Node)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeRef::new(i), node))
    }

    // =========================================================================
    // NODES
    // =========================================================================

    /// Add a fully formed node. References inside it must point into this
    /// builder.
    pub fn add(&mut self, node: Node) -> NodeRef {
        let this = NodeRef::new(self.nodes.len());
        if let [name] = node.canonical_name.parts() {
            self.packages.insert(Arc::clone(name), this);
        }
        self.nodes.push(node);
        this
    }

    /// Add a node with no type, members or bases.
    pub fn add_node(&mut self, id: NodeId, canonical_name: DottedPath, kind: Kind) -> NodeRef {
        self.add(Node::new(id, canonical_name, kind))
    }

    fn check(&self, node: NodeRef) {
        assert!(
            node.index() < self.nodes.len(),
            "node reference {} outside builder of {}",
            node.index(),
            self.nodes.len()
        );
    }

    fn slot(&mut self, node: NodeRef) -> &mut Node {
        self.check(node);
        &mut self.nodes[node.index()]
    }

    /// Set (or clear) the type of `node`.
    ///
    /// # Panics
    ///
    /// If `node` or `type_ref` was not handed out by this builder. The same
    /// holds for every edit below.
    pub fn set_type(&mut self, node: NodeRef, type_ref: Option<NodeRef>) {
        if let Some(ty) = type_ref {
            self.check(ty);
        }
        self.slot(node).type_ref = type_ref;
    }

    /// Insert or overwrite member `name` of `node`.
    pub fn set_member(&mut self, node: NodeRef, name: impl Into<Arc<str>>, target: Option<NodeRef>) {
        if let Some(target) = target {
            self.check(target);
        }
        self.slot(node).members.insert(name.into(), target);
    }

    /// Remove member `name` of `node`, returning its previous target.
    pub fn remove_member(&mut self, node: NodeRef, name: &str) -> Option<Option<NodeRef>> {
        self.slot(node).members.remove(name)
    }

    /// Append a base class to `node`.
    pub fn add_base(&mut self, node: NodeRef, base: Option<NodeRef>) {
        if let Some(base) = base {
            self.check(base);
        }
        self.slot(node).bases.push(base);
    }

    pub fn set_kind(&mut self, node: NodeRef, kind: Kind) {
        self.slot(node).kind = kind;
    }

    /// Replace the canonical name of `node`, keeping the package index in step.
    pub fn set_canonical_name(&mut self, node: NodeRef, name: DottedPath) {
        let old = std::mem::replace(&mut self.slot(node).canonical_name, name);
        if let [old_name] = old.parts() {
            if self.packages.get(old_name) == Some(&node) {
                self.packages.remove(old_name);
            }
        }
        if let [name] = self.nodes[node.index()].canonical_name.parts() {
            self.packages.insert(Arc::clone(name), node);
        }
    }

    // =========================================================================
    // LINKING
    // =========================================================================

    /// Make `path` navigable, creating whatever nodes are missing.
    ///
    /// The first component names a package; each following component is
    /// looked up in `members`. Missing (or unresolved) components become new
    /// nodes named by their prefix: `Kind::Module` for intermediates, `kind`
    /// for the last. An existing last node of `Kind::None` takes `kind`.
    ///
    /// Returns the node `path` now navigates to, or `None` for the empty path.
    pub fn link(&mut self, path: &DottedPath, kind: Kind) -> Option<NodeRef> {
        let parts = path.parts();
        let last = parts.len().checked_sub(1)?;
        let kind_at = |i: usize| if i == last { kind } else { Kind::Module };

        let head = &parts[0];
        let existing = self.packages.get(head).copied();
        let mut current = match existing {
            Some(pkg) => pkg,
            None => self.add_node(
                NodeId::UNASSIGNED,
                DottedPath::from_parts([head.as_ref()]),
                kind_at(0),
            ),
        };

        for (i, part) in parts.iter().enumerate().skip(1) {
            let existing = self.nodes[current.index()].members.get(part).copied();
            current = match existing {
                Some(Some(next)) => next,
                _ => {
                    let prefix = DottedPath::from_parts(parts[..=i].iter());
                    let created = self.add_node(NodeId::UNASSIGNED, prefix, kind_at(i));
                    self.set_member(current, Arc::clone(part), Some(created));
                    created
                }
            };
        }

        if self.nodes[current.index()].kind == Kind::None {
            self.set_kind(current, kind);
        }
        Some(current)
    }

    /// Publish the graph.
    #[must_use]
    pub fn build(self) -> Graph {
        Graph::publish(self.nodes)
    }
}

// =============================================================================
// MOCK GRAPHS
// =============================================================================

/// Build a graph in which every prefix of every path is a node whose
/// canonical name is that prefix. Intermediates are modules; leaves have
/// `Kind::None`. Ids are assigned from 1 in creation order.
#[must_use]
pub fn mock_graph(paths: &[&str]) -> Graph {
    let with_kinds: Vec<(&str, Kind)> = paths.iter().map(|&p| (p, Kind::None)).collect();
    mock_graph_with_kinds(&with_kinds)
}

/// Like `mock_graph`, with an explicit kind for each leaf.
#[must_use]
pub fn mock_graph_with_kinds(paths: &[(&str, Kind)]) -> Graph {
    let mut builder = GraphBuilder::new();
    for &(path, kind) in paths {
        builder.link(&DottedPath::new(path), kind);
    }
    let mut next = 1;
    for node in &mut builder.nodes {
        node.id = NodeId(next);
        next += 1;
        // a path listed on its own and as a prefix of another is still a module
        if node.kind == Kind::None && !node.members.is_empty() {
            node.kind = Kind::Module;
        }
    }
    builder.build()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_creates_missing_prefixes() {
        let mut b = GraphBuilder::new();
        let leaf = b
            .link(&DottedPath::new("os.path.join"), Kind::Function)
            .expect("link");
        assert_eq!(b.len(), 3);

        let graph = b.build();
        let os = graph.find("os").expect("os");
        assert_eq!(os.kind(), Kind::Module);
        assert_eq!(os.canonical_name(), &DottedPath::new("os"));
        assert_eq!(graph.find("os.path.join").expect("join").node_ref(), leaf);
        assert_eq!(graph.node(leaf).kind(), Kind::Function);
    }

    #[test]
    fn link_reuses_existing_nodes() {
        let mut b = GraphBuilder::new();
        let first = b.link(&DottedPath::new("os.path"), Kind::None);
        let second = b.link(&DottedPath::new("os.path"), Kind::Module);
        assert_eq!(first, second);
        assert_eq!(b.len(), 2);
        let path = first.and_then(|n| b.get(n)).expect("node");
        assert_eq!(path.kind, Kind::Module);
    }

    #[test]
    fn link_replaces_unresolved_member() {
        let mut b = GraphBuilder::new();
        let pkg = b.add_node(NodeId(1), DottedPath::new("pkg"), Kind::Module);
        b.set_member(pkg, "ghost", None);
        let ghost = b.link(&DottedPath::new("pkg.ghost"), Kind::Object);
        let graph = b.build();
        assert_eq!(graph.find("pkg.ghost").ok().map(|n| n.node_ref()), ghost);
    }

    #[test]
    fn removed_member_orphans_its_target() {
        let mut b = mock_graph(&["pkg.gone"]).into_builder();
        let pkg = b.link(&DottedPath::new("pkg"), Kind::Module).expect("pkg");
        let gone = b.remove_member(pkg, "gone").expect("was present");
        assert!(gone.is_some());
        assert_eq!(b.remove_member(pkg, "gone"), None);

        let graph = b.build();
        assert!(graph.find("pkg.gone").is_err());
        assert!(gone.and_then(|n| graph.any_path(n)).is_none());
    }

    #[test]
    fn link_empty_path_is_noop() {
        let mut b = GraphBuilder::new();
        assert!(b.link(&DottedPath::default(), Kind::Module).is_none());
        assert!(b.is_empty());
    }

    #[test]
    fn mock_graph_assigns_sequential_ids() {
        let graph = mock_graph(&["foo", "foo.bar", "ham.spam.bam"]);
        let ids: Vec<u64> = graph.nodes().map(|n| n.id().0).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert_eq!(graph.find("ham.spam.bam").expect("bam").kind(), Kind::None);
        assert_eq!(graph.find("ham.spam").expect("spam").kind(), Kind::Module);
        assert_eq!(graph.find("foo").expect("foo").kind(), Kind::Module);
    }

    #[test]
    #[should_panic(expected = "outside builder")]
    fn foreign_reference_is_rejected() {
        let mut b = GraphBuilder::new();
        let pkg = b.add_node(NodeId(1), DottedPath::new("pkg"), Kind::Module);
        b.set_member(pkg, "x", Some(NodeRef::new(7)));
    }

    #[test]
    fn renaming_moves_package_index() {
        let mut b = GraphBuilder::new();
        let pkg = b.add_node(NodeId(1), DottedPath::new("old"), Kind::Module);
        b.set_canonical_name(pkg, DottedPath::new("new"));
        let graph = b.build();
        assert!(graph.find("old").is_err());
        assert_eq!(graph.find("new").expect("new").node_ref(), pkg);
    }
}
