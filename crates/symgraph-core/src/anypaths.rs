//! # Canonical Path Assignment
//!
//! Every node reachable from the root through `members` gets exactly one
//! dotted path (its "any path") that navigates back to it.
//!
//! The computation is a shortest-path search where the distance of a path is
//! `DottedPath` order: fewer components first, then component-wise.
//!
//! 1. Nodes whose canonical name navigates back to themselves are *locked*
//!    to that name.
//! 2. Every package not already locked is seeded with its package name.
//! 3. The smallest pending entry is settled and offers `path.member` to each
//!    resolved member. An offer replaces an entry only if the entry is not
//!    locked, not settled, and not already made of fewer components.
//!
//! Between candidates with the same number of components the later offer
//! wins. Offers are made in member-name order from a totally ordered
//! frontier, so the same graph always gets the same paths.
//!
//! A settled entry is never replaced again: its children have already been
//! offered paths derived from it.

use crate::graph::navigate_members;
use crate::node::Node;
use crate::path::DottedPath;
use crate::NodeRef;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

struct Entry {
    path: DottedPath,
    locked: bool,
    settled: bool,
}

/// Pending entries ordered by path, with decrease-key by remove + insert.
#[derive(Default)]
struct Frontier {
    queue: BTreeSet<(DottedPath, NodeRef)>,
}

impl Frontier {
    fn push(&mut self, path: DottedPath, node: NodeRef) {
        self.queue.insert((path, node));
    }

    fn replace(&mut self, old: &DottedPath, path: DottedPath, node: NodeRef) {
        self.queue.remove(&(old.clone(), node));
        self.queue.insert((path, node));
    }

    fn pop(&mut self) -> Option<(DottedPath, NodeRef)> {
        self.queue.pop_first()
    }
}

/// Compute the any path of every node reachable from `root`.
///
/// `nodes` is the full arena, root included. The root itself never receives
/// a path.
pub(crate) fn compute_any_paths(
    nodes: &[Node],
    root: NodeRef,
    packages: &BTreeMap<Arc<str>, NodeRef>,
) -> BTreeMap<NodeRef, DottedPath> {
    let mut entries: BTreeMap<NodeRef, Entry> = BTreeMap::new();
    let mut frontier = Frontier::default();

    // Self-verifying canonical names
    for (index, node) in nodes.iter().enumerate() {
        let this = NodeRef::new(index);
        if this == root || node.canonical_name.is_empty() {
            continue;
        }
        if navigate_members(nodes, root, node.canonical_name.iter()) == Some(this) {
            entries.insert(
                this,
                Entry {
                    path: node.canonical_name.clone(),
                    locked: true,
                    settled: false,
                },
            );
            frontier.push(node.canonical_name.clone(), this);
        }
    }
    let locked = entries.len();

    for (name, &pkg) in packages {
        let path = DottedPath::from_parts([name.as_ref()]);
        offer(&mut entries, &mut frontier, pkg, path);
    }

    while let Some((path, current)) = frontier.pop() {
        let Some(entry) = entries.get_mut(&current) else {
            continue;
        };
        entry.settled = true;

        let Some(node) = nodes.get(current.index()) else {
            continue;
        };
        for (name, target) in &node.members {
            let Some(child) = *target else {
                continue;
            };
            // not expressible as one path component
            if child == root || name.is_empty() || name.contains('.') {
                continue;
            }
            offer(&mut entries, &mut frontier, child, path.child(name));
        }
    }

    tracing::debug!(
        reachable = entries.len(),
        locked,
        total = nodes.len().saturating_sub(1),
        "any paths computed"
    );

    entries
        .into_iter()
        .map(|(node, entry)| (node, entry.path))
        .collect()
}

fn offer(
    entries: &mut BTreeMap<NodeRef, Entry>,
    frontier: &mut Frontier,
    node: NodeRef,
    path: DottedPath,
) {
    match entries.get_mut(&node) {
        None => {
            frontier.push(path.clone(), node);
            entries.insert(
                node,
                Entry {
                    path,
                    locked: false,
                    settled: false,
                },
            );
        }
        Some(entry) => {
            if entry.locked || entry.settled || entry.path.len() < path.len() {
                return;
            }
            frontier.replace(&entry.path, path.clone(), node);
            entry.path = path;
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
