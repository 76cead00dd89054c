//! # Graph Engine
//!
//! The published, immutable symbol graph.
//!
//! A `Graph` owns an arena of nodes plus the synthetic root, the package
//! index, the id index and the any-path table. It is produced once by
//! `GraphBuilder::build` and never mutated afterwards, so a `&Graph` can be
//! shared freely between threads.
//!
//! All lookup tables use `BTreeMap` for deterministic ordering.

use crate::anypaths::compute_any_paths;
use crate::builder::GraphBuilder;
use crate::node::{Node, NodeView, lookup_attr};
use crate::path::DottedPath;
use crate::primitives::ROOT_NAME;
use crate::{Kind, NodeId, NodeRef, SymGraphError};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Follow `members` only (no type or base fallback) from `root`.
///
/// A component equal to `ROOT_NAME` is skipped.
pub(crate) fn navigate_members<'a, I>(nodes: &[Node], root: NodeRef, parts: I) -> Option<NodeRef>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut current = root;
    for part in parts {
        if part == ROOT_NAME {
            continue;
        }
        current = (*nodes.get(current.index())?.members.get(part)?)?;
    }
    Some(current)
}

/// The published symbol graph.
#[derive(Debug, Clone)]
pub struct Graph {
    /// Arena. The synthetic root occupies the last slot.
    nodes: Vec<Node>,

    root: NodeRef,

    /// Top-level package name -> node
    pkg_to_node: BTreeMap<Arc<str>, NodeRef>,

    /// Persisted identity -> node
    id_index: BTreeMap<NodeId, NodeRef>,

    /// Reachable node -> its canonical path
    any_paths: BTreeMap<NodeRef, DottedPath>,
}

/// Result of tracing a dotted identifier through attribute lookups.
struct Trace {
    node: NodeRef,
    trail: Vec<NodeRef>,
    canonical: String,
}

impl Graph {
    /// Publish `nodes` as a graph: create the root, index packages and ids,
    /// and compute any paths.
    pub(crate) fn publish(mut nodes: Vec<Node>) -> Self {
        let mut pkg_to_node = BTreeMap::new();
        let mut id_index = BTreeMap::new();

        for (index, node) in nodes.iter().enumerate() {
            let this = NodeRef::new(index);
            if node.id.is_assigned() {
                id_index.insert(node.id, this);
            }
            if let [name] = node.canonical_name.parts() {
                pkg_to_node.insert(Arc::clone(name), this);
            }
        }

        let root = NodeRef::new(nodes.len());
        let mut root_node = Node::new(NodeId::UNASSIGNED, DottedPath::new(ROOT_NAME), Kind::Root);
        root_node.members = pkg_to_node
            .iter()
            .map(|(name, &pkg)| (Arc::clone(name), Some(pkg)))
            .collect();
        nodes.push(root_node);

        let any_paths = compute_any_paths(&nodes, root, &pkg_to_node);

        tracing::debug!(
            nodes = nodes.len() - 1,
            packages = pkg_to_node.len(),
            reachable = any_paths.len(),
            "graph published"
        );

        Self {
            nodes,
            root,
            pkg_to_node,
            id_index,
            any_paths,
        }
    }

    /// Reopen this graph for editing. The root and derived tables are
    /// dropped and rebuilt by the next `build`.
    #[must_use]
    pub fn into_builder(mut self) -> GraphBuilder {
        self.nodes.truncate(self.root.index());
        GraphBuilder::from_nodes(self.nodes)
    }

    pub(crate) fn arena(&self) -> &[Node] {
        &self.nodes
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// View of a node handed out by this graph.
    ///
    /// # Panics
    ///
    /// If `node` does not belong to this graph's arena.
    #[must_use]
    pub fn node(&self, node: NodeRef) -> NodeView<'_> {
        assert!(
            node.index() < self.nodes.len(),
            "node reference {} outside arena of {}",
            node.index(),
            self.nodes.len()
        );
        NodeView::new(self, node)
    }

    /// View of a node, or `None` if `node` is outside this graph's arena.
    #[must_use]
    pub fn get(&self, node: NodeRef) -> Option<NodeView<'_>> {
        (node.index() < self.nodes.len()).then(|| NodeView::new(self, node))
    }

    /// The synthetic root. Its members are the top-level packages.
    #[must_use]
    pub fn root(&self) -> NodeView<'_> {
        NodeView::new(self, self.root)
    }

    /// Number of nodes, not counting the root.
    #[must_use]
    pub fn len(&self) -> usize {
        self.root.index()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every node except the root, in arena order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeView<'_>> + '_ {
        (0..self.root.index()).map(move |i| NodeView::new(self, NodeRef::new(i)))
    }

    /// Top-level packages, in name order.
    pub fn packages(&self) -> impl Iterator<Item = (&str, NodeView<'_>)> + '_ {
        self.pkg_to_node
            .iter()
            .map(move |(name, &pkg)| (name.as_ref(), NodeView::new(self, pkg)))
    }

    /// Look up a node by its persisted identity.
    #[must_use]
    pub fn find_by_id(&self, id: NodeId) -> Option<NodeView<'_>> {
        self.id_index.get(&id).map(|&n| NodeView::new(self, n))
    }

    /// The canonical path assigned to `node`, if it is reachable.
    #[must_use]
    pub fn any_path(&self, node: NodeRef) -> Option<&DottedPath> {
        self.any_paths.get(&node)
    }

    /// Every reachable node with its canonical path, in arena order.
    pub fn any_paths(&self) -> impl Iterator<Item = (NodeView<'_>, &DottedPath)> + '_ {
        self.any_paths
            .iter()
            .map(move |(&n, path)| (NodeView::new(self, n), path))
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Resolve a dotted identifier with attribute lookup, starting from the
    /// root. The empty identifier resolves to the root.
    ///
    /// # Errors
    ///
    /// `NotFound` if a component cannot be resolved, `NilMember` if it
    /// resolves to an unresolved target.
    pub fn find(&self, ident: &str) -> Result<NodeView<'_>, SymGraphError> {
        Ok(NodeView::new(self, self.trace(ident)?.node))
    }

    /// Resolve a path through `members` only; no type or base fallback.
    /// The empty path resolves to the root.
    ///
    /// # Errors
    ///
    /// `NotFound` naming the first component with no member entry,
    /// `NilMember` if that entry is unresolved.
    pub fn navigate(&self, path: &DottedPath) -> Result<NodeView<'_>, SymGraphError> {
        let mut current = self.root;
        for part in path.iter() {
            if part == ROOT_NAME {
                continue;
            }
            current = match self.nodes[current.index()].members.get(part) {
                Some(Some(next)) => *next,
                Some(None) => return Err(SymGraphError::nil_member(part, &path.to_string())),
                None => return Err(SymGraphError::not_found(part, &path.to_string())),
            };
        }
        Ok(NodeView::new(self, current))
    }

    /// Resolve `ident` like `find` and build the canonical form of the name.
    ///
    /// Each component contributes the canonical name of the node it reaches;
    /// an intermediate component with no canonical name of its own borrows
    /// its type's; otherwise the raw component is appended.
    ///
    /// # Errors
    ///
    /// Same as `find`.
    pub fn canonical_name(&self, ident: &str) -> Result<String, SymGraphError> {
        Ok(self.trace(ident)?.canonical)
    }

    fn trace(&self, ident: &str) -> Result<Trace, SymGraphError> {
        let mut trace = Trace {
            node: self.root,
            trail: Vec::new(),
            canonical: String::new(),
        };
        if ident.is_empty() {
            return Ok(trace);
        }

        let parts: Vec<&str> = ident.split('.').collect();
        let last = parts.len() - 1;
        for (i, part) in parts.into_iter().enumerate() {
            if part == ROOT_NAME {
                continue;
            }
            let next = match lookup_attr(&self.nodes, trace.node, part, 0) {
                Some(Some(next)) => next,
                Some(None) => return Err(SymGraphError::nil_member(part, ident)),
                None => return Err(SymGraphError::not_found(part, ident)),
            };

            let node = &self.nodes[next.index()];
            let type_name = node
                .type_ref
                .map(|t| &self.nodes[t.index()].canonical_name)
                .filter(|name| !name.is_empty());
            match type_name {
                _ if !node.canonical_name.is_empty() => {
                    trace.canonical = node.canonical_name.to_string();
                }
                Some(type_name) if i != last => trace.canonical = type_name.to_string(),
                _ => {
                    if !trace.canonical.is_empty() {
                        trace.canonical.push('.');
                    }
                    trace.canonical.push_str(part);
                }
            }

            trace.trail.push(next);
            trace.node = next;
        }
        Ok(trace)
    }

    /// Visit the node named by `ident`, then everything reachable from it
    /// through `members`, depth first in member-name order.
    ///
    /// `walker` receives the dotted name it was reached by and the node.
    /// Returning `false` for `ident` itself stops the walk; returning
    /// `false` for any other node skips that node's members. Each node is
    /// visited at most once, and nodes on the path to `ident` are never
    /// revisited.
    ///
    /// # Errors
    ///
    /// Same as `find`, except that the empty identifier names no package
    /// and is `NotFound`.
    pub fn walk<F>(&self, ident: &str, mut walker: F) -> Result<(), SymGraphError>
    where
        F: FnMut(&str, NodeView<'_>) -> bool,
    {
        if ident.is_empty() {
            return Err(SymGraphError::not_found("", ident));
        }
        let trace = self.trace(ident)?;
        if !walker(ident, NodeView::new(self, trace.node)) {
            return Ok(());
        }
        let mut seen: BTreeSet<NodeRef> = trace.trail.into_iter().collect();
        self.walk_members(ident, trace.node, &mut walker, &mut seen);
        Ok(())
    }

    /// Walk everything whose dotted name begins with `prefix`.
    ///
    /// A prefix without dots completes package names. Otherwise the
    /// components before the last must name a package and a chain of
    /// members; the last component is matched against member names.
    /// `walker` behaves as in `walk`, and each match is walked recursively.
    ///
    /// # Errors
    ///
    /// `NotFound` if the package or an intermediate member is missing,
    /// `NilMember` if an intermediate member is unresolved.
    pub fn walk_prefix<F>(&self, prefix: &str, mut walker: F) -> Result<(), SymGraphError>
    where
        F: FnMut(&str, NodeView<'_>) -> bool,
    {
        let mut seen = BTreeSet::new();
        let parts: Vec<&str> = prefix.split('.').collect();

        let [head, middle @ .., last] = parts.as_slice() else {
            for (name, &pkg) in &self.pkg_to_node {
                if !name.starts_with(prefix) {
                    continue;
                }
                if !walker(name.as_ref(), NodeView::new(self, pkg)) {
                    continue;
                }
                seen.insert(pkg);
                self.walk_members(name, pkg, &mut walker, &mut seen);
            }
            return Ok(());
        };

        let mut node = *self
            .pkg_to_node
            .get(*head)
            .ok_or_else(|| SymGraphError::not_found(head, prefix))?;
        for part in middle {
            node = match self.nodes[node.index()].members.get(*part) {
                Some(Some(next)) => *next,
                Some(None) => return Err(SymGraphError::nil_member(part, prefix)),
                None => return Err(SymGraphError::not_found(part, prefix)),
            };
        }

        let parent = parts[..parts.len() - 1].join(".");
        for (name, target) in &self.nodes[node.index()].members {
            let Some(member) = *target else {
                continue;
            };
            if !name.starts_with(*last) {
                continue;
            }
            let full = format!("{parent}.{name}");
            if !walker(&full, NodeView::new(self, member)) {
                continue;
            }
            seen.insert(member);
            self.walk_members(&full, member, &mut walker, &mut seen);
        }
        Ok(())
    }

    /// Depth-first walk over the members of `start` (not `start` itself).
    fn walk_members<F>(
        &self,
        prefix: &str,
        start: NodeRef,
        walker: &mut F,
        seen: &mut BTreeSet<NodeRef>,
    ) where
        F: FnMut(&str, NodeView<'_>) -> bool,
    {
        let mut stack = Vec::new();
        self.push_members(prefix, start, &mut stack);

        while let Some((name, node)) = stack.pop() {
            if !seen.insert(node) {
                continue;
            }
            if walker(&name, NodeView::new(self, node)) {
                self.push_members(&name, node, &mut stack);
            }
        }
    }

    /// Push resolved members so that the smallest name is popped first.
    fn push_members(&self, prefix: &str, node: NodeRef, stack: &mut Vec<(String, NodeRef)>) {
        for (name, target) in self.nodes[node.index()].members.iter().rev() {
            if let Some(member) = *target {
                stack.push((format!("{prefix}.{name}"), member));
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{mock_graph, mock_graph_with_kinds};

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn graph_is_shareable() {
        assert_send_sync::<Graph>();
    }

    #[test]
    fn find_missing_package_reports_component() {
        let graph = mock_graph(&["os.path.join"]);
        let err = graph.find("sys").expect_err("sys is absent");
        assert!(matches!(
            &err,
            SymGraphError::NotFound { component, .. } if component == "sys"
        ));
        assert!(graph.find("os.path.join").is_ok());
    }

    #[test]
    fn find_skips_root_name() {
        let graph = mock_graph(&["os.path"]);
        let direct = graph.find("os.path").expect("find");
        let rooted = graph
            .find(&format!("{ROOT_NAME}.os.path"))
            .expect("find with root");
        assert_eq!(direct, rooted);
        assert_eq!(graph.find("").expect("root"), graph.root());
    }

    #[test]
    fn find_reports_nil_member() {
        let mut b = GraphBuilder::new();
        let pkg = b.add_node(NodeId(1), DottedPath::new("pkg"), Kind::Module);
        b.set_member(pkg, "ghost", None);
        let graph = b.build();

        let err = graph.find("pkg.ghost").expect_err("nil member");
        assert!(matches!(err, SymGraphError::NilMember { .. }));
        assert!(err.is_not_found());
    }

    #[test]
    fn navigate_reports_failing_component() {
        let mut b = GraphBuilder::new();
        let pkg = b.add_node(NodeId(1), DottedPath::new("pkg"), Kind::Module);
        b.set_member(pkg, "ghost", None);
        let graph = b.build();

        let err = graph
            .navigate(&DottedPath::new("pkg.ghost.x"))
            .expect_err("nil member");
        assert!(matches!(
            &err,
            SymGraphError::NilMember { component, ident } if component == "ghost" && ident == "pkg.ghost.x"
        ));

        let err = graph.navigate(&DottedPath::new("sys.path")).expect_err("absent");
        assert!(matches!(
            &err,
            SymGraphError::NotFound { component, .. } if component == "sys"
        ));

        assert_eq!(graph.navigate(&DottedPath::default()).expect("root"), graph.root());
    }

    #[test]
    fn find_uses_attribute_fallback_but_navigate_does_not() {
        let mut b = GraphBuilder::new();
        let pkg = b.add_node(NodeId(1), DottedPath::new("pkg"), Kind::Module);
        let cls = b.add_node(NodeId(2), DottedPath::new("pkg.Cls"), Kind::Type);
        let obj = b.add_node(NodeId(3), DottedPath::new("pkg.obj"), Kind::Object);
        let method = b.add_node(NodeId(4), DottedPath::new("pkg.Cls.run"), Kind::Function);
        b.set_member(pkg, "Cls", Some(cls));
        b.set_member(pkg, "obj", Some(obj));
        b.set_member(cls, "run", Some(method));
        b.set_type(obj, Some(cls));
        let graph = b.build();

        assert_eq!(graph.find("pkg.obj.run").expect("find").node_ref(), method);
        let err = graph
            .navigate(&DottedPath::new("pkg.obj.run"))
            .expect_err("navigate ignores types");
        assert_eq!(err.to_string(), "failed to find run component in pkg.obj.run");
        assert_eq!(
            graph
                .navigate(&DottedPath::new("pkg.Cls.run"))
                .expect("navigate")
                .node_ref(),
            method
        );
    }

    #[test]
    fn canonical_name_uses_type_for_intermediates() {
        let mut b = GraphBuilder::new();
        let pkg = b.add_node(NodeId(1), DottedPath::new("pkg"), Kind::Module);
        let cls = b.add_node(NodeId(2), DottedPath::new("pkg.impl.Cls"), Kind::Type);
        let obj = b.add_node(NodeId(3), DottedPath::new(""), Kind::Object);
        let method = b.add_node(NodeId(4), DottedPath::new(""), Kind::Function);
        b.set_member(pkg, "obj", Some(obj));
        b.set_member(cls, "run", Some(method));
        b.set_type(obj, Some(cls));
        let graph = b.build();

        assert_eq!(
            graph.canonical_name("pkg.obj.run").expect("canonical"),
            "pkg.impl.Cls.run"
        );
        // last component keeps its raw name
        assert_eq!(graph.canonical_name("pkg.obj").expect("canonical"), "pkg.obj");
    }

    #[test]
    fn walk_visits_members_in_name_order() {
        let graph = mock_graph(&["pkg.b.x", "pkg.a", "pkg.c"]);
        let mut visited = Vec::new();
        graph
            .walk("pkg", |name, _| {
                visited.push(name.to_string());
                true
            })
            .expect("walk");
        assert_eq!(visited, vec!["pkg", "pkg.a", "pkg.b", "pkg.b.x", "pkg.c"]);
    }

    #[test]
    fn walk_stops_when_start_is_rejected() {
        let graph = mock_graph(&["pkg.a"]);
        let mut count = 0;
        graph
            .walk("pkg", |_, _| {
                count += 1;
                false
            })
            .expect("walk");
        assert_eq!(count, 1);
    }

    #[test]
    fn walk_prunes_rejected_subtrees() {
        let graph = mock_graph(&["pkg.a.deep", "pkg.b"]);
        let mut visited = Vec::new();
        graph
            .walk("pkg", |name, _| {
                visited.push(name.to_string());
                name != "pkg.a"
            })
            .expect("walk");
        assert_eq!(visited, vec!["pkg", "pkg.a", "pkg.b"]);
    }

    #[test]
    fn walk_does_not_revisit_ancestors() {
        let mut b = GraphBuilder::new();
        let pkg = b.add_node(NodeId(1), DottedPath::new("pkg"), Kind::Module);
        let sub = b.add_node(NodeId(2), DottedPath::new("pkg.sub"), Kind::Module);
        b.set_member(pkg, "sub", Some(sub));
        b.set_member(sub, "parent", Some(pkg));
        b.set_member(sub, "me", Some(sub));
        let graph = b.build();

        let mut visited = Vec::new();
        graph
            .walk("pkg.sub", |name, _| {
                visited.push(name.to_string());
                true
            })
            .expect("walk");
        assert_eq!(visited, vec!["pkg.sub"]);
    }

    #[test]
    fn walk_rejects_empty_ident() {
        let graph = mock_graph(&["os.path"]);
        let mut visited = 0;
        let err = graph
            .walk("", |_, _| {
                visited += 1;
                true
            })
            .expect_err("empty ident");
        assert!(err.is_not_found());
        assert_eq!(visited, 0);
    }

    #[test]
    fn walk_prefix_completes_packages() {
        let graph = mock_graph(&["numpy.array", "numbers", "os"]);
        let mut visited = Vec::new();
        graph
            .walk_prefix("num", |name, _| {
                visited.push(name.to_string());
                true
            })
            .expect("walk_prefix");
        assert_eq!(visited, vec!["numbers", "numpy", "numpy.array"]);
    }

    #[test]
    fn walk_prefix_completes_members() {
        let graph = mock_graph_with_kinds(&[
            ("os.path.join", Kind::Function),
            ("os.path.exists", Kind::Function),
            ("os.pathsep", Kind::Object),
            ("os.sep", Kind::Object),
        ]);
        let mut visited = Vec::new();
        graph
            .walk_prefix("os.pa", |name, _| {
                visited.push(name.to_string());
                !name.ends_with("path")
            })
            .expect("walk_prefix");
        assert_eq!(visited, vec!["os.path", "os.pathsep"]);
    }

    #[test]
    fn walk_prefix_errors() {
        let mut b = GraphBuilder::new();
        let pkg = b.add_node(NodeId(1), DottedPath::new("pkg"), Kind::Module);
        b.set_member(pkg, "ghost", None);
        let graph = b.build();

        let noop = |_: &str, _: NodeView<'_>| true;
        assert!(matches!(
            graph.walk_prefix("nope.x", noop),
            Err(SymGraphError::NotFound { .. })
        ));
        assert!(matches!(
            graph.walk_prefix("pkg.missing.x", noop),
            Err(SymGraphError::NotFound { .. })
        ));
        assert!(matches!(
            graph.walk_prefix("pkg.ghost.x", noop),
            Err(SymGraphError::NilMember { .. })
        ));
        assert!(graph.walk_prefix("pkg.", noop).is_ok());
    }

    #[test]
    fn find_by_id_and_packages() {
        let graph = mock_graph(&["b.x", "a"]);
        let names: Vec<&str> = graph.packages().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["a", "b"]);

        let x = graph.find("b.x").expect("find");
        assert_eq!(graph.find_by_id(x.id()), Some(x));
        assert!(graph.find_by_id(NodeId(999)).is_none());
        assert_eq!(graph.len(), 3);
    }

    #[test]
    fn into_builder_round_trip() {
        let graph = mock_graph(&["pkg.a"]);
        let before = graph.len();
        let mut builder = graph.into_builder();
        builder.link(&DottedPath::new("pkg.b"), Kind::Function);
        let graph = builder.build();

        assert_eq!(graph.len(), before + 1);
        assert_eq!(graph.find("pkg.b").expect("find").kind(), Kind::Function);
        assert_eq!(graph.root().members().count(), 1);
    }
}
