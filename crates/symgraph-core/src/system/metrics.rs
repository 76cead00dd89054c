use crate::graph::Graph;
use crate::Kind;
use serde::Serialize;
use std::collections::BTreeMap;

/// Shape of a published graph, as reported by `status`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphMetrics {
    /// Nodes, not counting the root.
    pub node_count: usize,
    /// Top-level packages.
    pub package_count: usize,
    /// Member entries across all nodes, resolved or not.
    pub member_edge_count: usize,
    /// Member entries whose target is unresolved.
    pub nil_member_count: usize,
    /// Nodes with an any path.
    pub any_path_count: usize,
    /// Nodes whose any path is their own (self-verifying) canonical name.
    pub locked_count: usize,
    /// Nodes unreachable from any package.
    pub orphan_count: usize,
    /// Nodes per kind. Kinds with no nodes are omitted.
    pub kinds: BTreeMap<Kind, usize>,
}

impl GraphMetrics {
    /// Compute metrics from a graph.
    #[must_use]
    pub fn from_graph(graph: &Graph) -> Self {
        let mut metrics = Self {
            node_count: graph.len(),
            package_count: graph.packages().count(),
            ..Self::default()
        };

        for node in graph.nodes() {
            *metrics.kinds.entry(node.kind()).or_default() += 1;
            for (_, target) in node.members() {
                metrics.member_edge_count += 1;
                if target.is_none() {
                    metrics.nil_member_count += 1;
                }
            }

            match node.any_path() {
                Some(path) => {
                    metrics.any_path_count += 1;
                    let self_verifying = graph
                        .navigate(node.canonical_name())
                        .is_ok_and(|found| found == node);
                    if path == node.canonical_name() && self_verifying {
                        metrics.locked_count += 1;
                    }
                }
                None => metrics.orphan_count += 1,
            }
        }

        metrics
    }

    /// Share of nodes with an any path, in parts per thousand (integer only).
    #[must_use]
    pub fn coverage_per_thousand(&self) -> u64 {
        if self.node_count == 0 {
            return 0;
        }
        (self.any_path_count as u64).saturating_mul(1000) / self.node_count as u64
    }
}
