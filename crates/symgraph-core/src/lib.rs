//! # symgraph-core
//!
//! The symbol graph engine: an in-memory graph of importable Python symbols
//! (packages, modules, types, functions, descriptors, objects) and the
//! attribute relationships between them.
//!
//! ## Lifecycle
//!
//! 1. Inflate flat records (from a file, a redb store or JSON) into a
//!    `GraphBuilder`, or build one directly.
//! 2. Optionally link extra paths into it (skeleton linking).
//! 3. `build()` publishes an immutable `Graph`: the root, package index, id
//!    index and canonical paths are computed once.
//! 4. Query the `Graph` from as many threads as needed.
//!
//! ## Architectural Constraints
//!
//! - Pure Rust: no async, no network dependencies
//! - Nodes live in an arena and refer to each other by index, so the cyclic
//!   Python object model never becomes an ownership cycle
//! - Deterministic containers: `BTreeMap`/`BTreeSet`, no `HashMap`
//! - Every traversal is bounded: attribute resolution by `MAX_ATTR_DEPTH`,
//!   walks and path assignment by the reachable graph

// =============================================================================
// MODULES
// =============================================================================

mod anypaths;
pub mod builder;
pub mod compact;
pub mod flat;
pub mod formats;
pub mod graph;
pub mod interner;
pub mod node;
pub mod path;
pub mod primitives;
pub mod storage;
pub mod system;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{Kind, NodeId, NodeRef, SymGraphError};

// =============================================================================
// RE-EXPORTS: Graph Engine
// =============================================================================

pub use builder::{GraphBuilder, mock_graph, mock_graph_with_kinds};
pub use compact::{CompactNode, CompactRef, Compacted};
pub use flat::{FlatMember, FlatNode, Inflater};
pub use graph::Graph;
pub use interner::Interner;
pub use node::{Node, NodeView};
pub use path::DottedPath;
pub use storage::RedbNodeStore;

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{PersistenceHeader, graph_from_bytes, graph_to_bytes};

// =============================================================================
// RE-EXPORTS: System (from system module)
// =============================================================================

pub use system::GraphMetrics;
