//! # Storage
//!
//! Persistent backends for flat node records.

mod redb_store;

pub use redb_store::RedbNodeStore;
