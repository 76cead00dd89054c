//! # Formats
//!
//! Byte-level encodings of the flat representation.

pub mod persistence;

pub use persistence::{
    PersistenceHeader, graph_from_bytes, graph_to_bytes, nodes_from_bytes, nodes_to_bytes,
    records_checksum,
};

#[cfg(feature = "crypto-hash")]
pub use persistence::{compute_blake3_hash, graph_crypto_hash};
