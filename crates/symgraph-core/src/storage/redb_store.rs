//! # redb-backed Node Store
//!
//! A disk-backed store of flat node records using the redb embedded
//! database.
//!
//! - ACID transactions: `write_nodes` and `replace_nodes` commit a whole
//!   load or nothing
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! The store holds `FlatNode` records keyed by id. A `Graph` is still built
//! in memory from them; the store only replaces the flat file.

use crate::flat::FlatNode;
use crate::{NodeId, SymGraphError, primitives};
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use std::path::Path;

/// Table for nodes: NodeId(u64) -> postcard FlatNode bytes
const NODES: TableDefinition<u64, &[u8]> = TableDefinition::new("nodes");

/// Table for metadata: key string -> value u64
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

const FORMAT_VERSION_KEY: &str = "format_version";

fn io_err(e: impl std::fmt::Display) -> SymGraphError {
    SymGraphError::IoError(e.to_string())
}

/// Encode and insert `nodes` inside an open write transaction.
fn insert_records(write_txn: &WriteTransaction, nodes: &[FlatNode]) -> Result<(), SymGraphError> {
    let mut table = write_txn.open_table(NODES).map_err(io_err)?;
    for node in nodes {
        let bytes = postcard::to_allocvec(node)
            .map_err(|e| SymGraphError::SerializationError(e.to_string()))?;
        table.insert(node.id.0, bytes.as_slice()).map_err(io_err)?;
    }
    Ok(())
}

/// A disk-backed flat node store.
pub struct RedbNodeStore {
    db: Database,
}

impl std::fmt::Debug for RedbNodeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbNodeStore").finish_non_exhaustive()
    }
}

impl RedbNodeStore {
    /// Open or create a store at the given path.
    ///
    /// # Errors
    ///
    /// `IoError` if the database cannot be opened, `DeserializationError` if
    /// it was written by an incompatible format version.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SymGraphError> {
        let db = Database::create(path.as_ref()).map_err(io_err)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(io_err)?;
            {
                let _ = write_txn.open_table(NODES).map_err(io_err)?;
                let mut meta = write_txn.open_table(METADATA).map_err(io_err)?;
                let stored = meta
                    .get(FORMAT_VERSION_KEY)
                    .map_err(io_err)?
                    .map(|v| v.value());
                match stored {
                    None => {
                        meta.insert(FORMAT_VERSION_KEY, u64::from(primitives::FORMAT_VERSION))
                            .map_err(io_err)?;
                    }
                    Some(v) if v == u64::from(primitives::FORMAT_VERSION) => {}
                    Some(v) => {
                        return Err(SymGraphError::DeserializationError(format!(
                            "Unsupported store version: {} (expected {})",
                            v,
                            primitives::FORMAT_VERSION
                        )));
                    }
                }
            }
            write_txn.commit().map_err(io_err)?;
        }

        Ok(Self { db })
    }

    /// Write `nodes` in a single transaction, replacing records with the
    /// same id.
    ///
    /// # Errors
    ///
    /// `SerializationError` if a record cannot be encoded, `IoError` on
    /// storage failure. Nothing is written on error.
    pub fn write_nodes(&mut self, nodes: &[FlatNode]) -> Result<(), SymGraphError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        insert_records(&write_txn, nodes)?;
        write_txn.commit().map_err(io_err)?;

        tracing::debug!(records = nodes.len(), "node records written");
        Ok(())
    }

    /// Replace the whole contents of the store with `nodes`, in a single
    /// transaction.
    ///
    /// # Errors
    ///
    /// Same as `write_nodes`. On error the previous records are kept.
    pub fn replace_nodes(&mut self, nodes: &[FlatNode]) -> Result<(), SymGraphError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        write_txn.delete_table(NODES).map_err(io_err)?;
        insert_records(&write_txn, nodes)?;
        write_txn.commit().map_err(io_err)?;

        tracing::debug!(records = nodes.len(), "node records replaced");
        Ok(())
    }

    /// Every record, in id order.
    ///
    /// # Errors
    ///
    /// `IoError` on storage failure, `DeserializationError` for a corrupt
    /// record.
    pub fn read_nodes(&self) -> Result<Vec<FlatNode>, SymGraphError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(NODES).map_err(io_err)?;

        let mut nodes = Vec::new();
        for entry in table.iter().map_err(io_err)? {
            let (_, value) = entry.map_err(io_err)?;
            let node: FlatNode = postcard::from_bytes(value.value())
                .map_err(|e| SymGraphError::DeserializationError(e.to_string()))?;
            nodes.push(node);
        }
        Ok(nodes)
    }

    /// The record with `id`, if stored.
    ///
    /// # Errors
    ///
    /// Same as `read_nodes`.
    pub fn get(&self, id: NodeId) -> Result<Option<FlatNode>, SymGraphError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(NODES).map_err(io_err)?;

        match table.get(id.0).map_err(io_err)? {
            Some(data) => {
                let node: FlatNode = postcard::from_bytes(data.value())
                    .map_err(|e| SymGraphError::DeserializationError(e.to_string()))?;
                Ok(Some(node))
            }
            None => Ok(None),
        }
    }

    /// Number of stored records.
    ///
    /// # Errors
    ///
    /// `IoError` on storage failure.
    pub fn node_count(&self) -> Result<usize, SymGraphError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(NODES).map_err(io_err)?;
        let count = table.len().map_err(io_err)?;
        Ok(count as usize)
    }

    /// Remove every record.
    ///
    /// # Errors
    ///
    /// `IoError` on storage failure.
    pub fn clear(&mut self) -> Result<(), SymGraphError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        write_txn.delete_table(NODES).map_err(io_err)?;
        {
            let _ = write_txn.open_table(NODES).map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
