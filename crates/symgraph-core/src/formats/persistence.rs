//! # Persistence Format
//!
//! Binary serialization for symbol graphs.
//!
//! File I/O operations are in the app layer; this module only maps between
//! bytes and flat records.
//!
//! Format:
//! ```text
//! [magic "SYMG"] [version u8] [header_len u32 LE] [PersistenceHeader (postcard)] [Vec<FlatNode> (postcard)]
//! ```
//!
//! Records are sorted by id, so save -> load -> save is bit-exact.
//!
//! ## Validation
//!
//! Before any payload is decoded:
//! - Minimum and maximum total size
//! - Magic bytes and version
//! - Declared node count against `MAX_IMPORT_NODE_COUNT`
//!
//! After decoding, the record count and checksum must match the header.

use crate::flat::FlatNode;
use crate::graph::Graph;
use crate::interner::Interner;
use crate::{primitives, SymGraphError};
use serde::{Deserialize, Serialize};

/// Magic + version.
const PREAMBLE_SIZE: usize = 5;

/// Preamble plus the header length field.
const MIN_FILE_SIZE: usize = PREAMBLE_SIZE + 4;

// =============================================================================
// FILE HEADER
// =============================================================================

/// Counts and checksum of the records that follow.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersistenceHeader {
    /// Number of flat records.
    pub node_count: u64,

    /// Checksum of the records (see `records_checksum`).
    pub checksum: u64,
}

impl PersistenceHeader {
    /// Describe `nodes`.
    #[must_use]
    pub fn for_nodes(nodes: &[FlatNode]) -> Self {
        Self {
            node_count: nodes.len() as u64,
            checksum: records_checksum(nodes),
        }
    }
}

/// Deterministic checksum of flat records.
///
/// XOR of rotated fields; order-insensitive within the record list.
///
/// # Security Note
///
/// This is **NOT** a cryptographic hash. It detects accidental corruption
/// only. Enable the `crypto-hash` feature for BLAKE3 digests.
#[must_use]
pub fn records_checksum(nodes: &[FlatNode]) -> u64 {
    let mut hash: u64 = 0;

    for node in nodes {
        hash ^= node.id.0.rotate_left(13);
        hash ^= u64::from(u8::from(node.classification)).rotate_left(7);
        hash ^= node.canonical_name.hash_value().rotate_left(3);
        if let Some(ty) = node.type_id {
            hash ^= ty.0.rotate_left(17);
        }
        for member in &node.members {
            for byte in member.attr.as_bytes() {
                hash ^= u64::from(*byte).rotate_left(23);
            }
            if let Some(id) = member.node_id {
                hash ^= id.0.rotate_left(11);
            }
        }
        for base in node.base_ids.iter().flatten() {
            hash ^= base.0.rotate_left(19);
        }
    }

    hash
}

// =============================================================================
// SERIALIZATION FUNCTIONS
// =============================================================================

/// Serialize flat records (header + payload), sorting them by id.
///
/// # Errors
///
/// `SerializationError` if postcard encoding fails.
pub fn nodes_to_bytes(nodes: &[FlatNode]) -> Result<Vec<u8>, SymGraphError> {
    let mut sorted = nodes.to_vec();
    sorted.sort_by_key(|n| n.id);

    let header = PersistenceHeader::for_nodes(&sorted);
    let header_bytes = postcard::to_stdvec(&header)
        .map_err(|e| SymGraphError::SerializationError(format!("Header: {e}")))?;
    let payload = postcard::to_stdvec(&sorted)
        .map_err(|e| SymGraphError::SerializationError(format!("Data: {e}")))?;

    let header_len = u32::try_from(header_bytes.len())
        .map_err(|_| SymGraphError::SerializationError("Header too large".to_string()))?;

    let mut result = Vec::with_capacity(MIN_FILE_SIZE + header_bytes.len() + payload.len());
    result.extend_from_slice(primitives::MAGIC_BYTES);
    result.push(primitives::FORMAT_VERSION);
    result.extend_from_slice(&header_len.to_le_bytes());
    result.extend_from_slice(&header_bytes);
    result.extend_from_slice(&payload);

    Ok(result)
}

/// Deserialize flat records.
///
/// # Errors
///
/// `DeserializationError` if any validation step fails or the data is
/// corrupted. Error messages stay generic about the expected layout.
pub fn nodes_from_bytes(bytes: &[u8]) -> Result<Vec<FlatNode>, SymGraphError> {
    if bytes.len() < MIN_FILE_SIZE {
        return Err(SymGraphError::DeserializationError(format!(
            "Data too short: minimum {MIN_FILE_SIZE} bytes required"
        )));
    }

    if bytes.len() > primitives::MAX_PERSISTENCE_PAYLOAD_SIZE {
        return Err(SymGraphError::DeserializationError(format!(
            "Data size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            primitives::MAX_PERSISTENCE_PAYLOAD_SIZE
        )));
    }

    if &bytes[0..4] != primitives::MAGIC_BYTES {
        return Err(SymGraphError::DeserializationError(
            "Invalid file format".to_string(),
        ));
    }
    if bytes[4] != primitives::FORMAT_VERSION {
        return Err(SymGraphError::DeserializationError(format!(
            "Unsupported version: {} (expected {})",
            bytes[4],
            primitives::FORMAT_VERSION
        )));
    }

    let header_len =
        u32::from_le_bytes([bytes[5], bytes[6], bytes[7], bytes[8]]) as usize;
    let payload_start = MIN_FILE_SIZE.saturating_add(header_len);
    if bytes.len() < payload_start {
        return Err(SymGraphError::DeserializationError(
            "Data too short for header".to_string(),
        ));
    }

    let header: PersistenceHeader = postcard::from_bytes(&bytes[MIN_FILE_SIZE..payload_start])
        .map_err(|e| SymGraphError::DeserializationError(format!("Header: {e}")))?;

    if header.node_count > primitives::MAX_IMPORT_NODE_COUNT {
        return Err(SymGraphError::DeserializationError(format!(
            "Node count {} exceeds maximum allowed {}",
            header.node_count,
            primitives::MAX_IMPORT_NODE_COUNT
        )));
    }

    let nodes: Vec<FlatNode> = postcard::from_bytes(&bytes[payload_start..])
        .map_err(|e| SymGraphError::DeserializationError(format!("Data: {e}")))?;

    if nodes.len() as u64 != header.node_count {
        return Err(SymGraphError::DeserializationError(
            "Node count mismatch".to_string(),
        ));
    }
    let computed = records_checksum(&nodes);
    if computed != header.checksum {
        return Err(SymGraphError::DeserializationError(format!(
            "Checksum mismatch: expected {}, got {}",
            header.checksum, computed
        )));
    }

    Ok(nodes)
}

/// Serialize every node of a graph.
///
/// # Errors
///
/// See `nodes_to_bytes`.
pub fn graph_to_bytes(graph: &Graph) -> Result<Vec<u8>, SymGraphError> {
    nodes_to_bytes(&graph.flatten_all())
}

/// Deserialize and publish a graph.
///
/// # Errors
///
/// See `nodes_from_bytes`.
pub fn graph_from_bytes(bytes: &[u8], interner: &mut Interner) -> Result<Graph, SymGraphError> {
    let nodes = nodes_from_bytes(bytes)?;
    Ok(Graph::from_flat(&nodes, interner))
}

// =============================================================================
// CRYPTOGRAPHIC HASH SUPPORT
// =============================================================================

/// BLAKE3 hex digest (64 characters) of arbitrary bytes.
///
/// # Requires
///
/// The `crypto-hash` feature.
#[cfg(feature = "crypto-hash")]
#[must_use]
pub fn compute_blake3_hash(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

/// BLAKE3 hex digest of a graph's persisted bytes.
///
/// # Errors
///
/// See `graph_to_bytes`.
///
/// # Requires
///
/// The `crypto-hash` feature.
#[cfg(feature = "crypto-hash")]
pub fn graph_crypto_hash(graph: &Graph) -> Result<String, SymGraphError> {
    Ok(compute_blake3_hash(&graph_to_bytes(graph)?))
}

// =============================================================================
// TESTS
// =============================================================================
