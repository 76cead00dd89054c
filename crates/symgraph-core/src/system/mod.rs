//! # System Module
//!
//! Whole-graph metrics.
//!
//! Computed on demand from a published graph; nothing here is cached or
//! persisted.

mod metrics;

pub use metrics::*;
