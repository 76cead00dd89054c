//! # Engine Primitives
//!
//! Hardcoded constants for the symgraph engine.
//!
//! These are compiled into the binary and are immutable at runtime.

/// Maximum recursion depth for attribute resolution.
///
/// - `attr`, `attrs` and `has_unresolved_base` follow `Type` and `Bases`
///   links at most this many levels deep.
/// - Past the limit, resolution reports "not found" without an error.
/// - Malformed data can make `Bases`/`Type` chains cyclic; this is what
///   keeps resolution bounded on such data.
pub const MAX_ATTR_DEPTH: usize = 10;

/// Canonical name of the synthetic root node.
///
/// `find` and `navigate` skip a path component equal to this name, so
/// `"kiteroot065151.os.path"` resolves the same as `"os.path"`.
pub const ROOT_NAME: &str = "kiteroot065151";

/// Magic bytes for the symgraph binary format header.
///
/// - File Header = Magic Bytes ("SYMG") + Version (u8) before payload.
pub const MAGIC_BYTES: &[u8; 4] = b"SYMG";

/// Current serialization format version.
///
/// Increment this when making breaking changes to the serialization format.
/// `Kind` wire values are NOT allowed to change between versions.
pub const FORMAT_VERSION: u8 = 1;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum allowed payload size for persisted graphs (1 GB).
///
/// Validated BEFORE attempting deserialization.
pub const MAX_PERSISTENCE_PAYLOAD_SIZE: usize = 1024 * 1024 * 1024;

/// Maximum number of node records accepted from a persisted graph.
pub const MAX_IMPORT_NODE_COUNT: u64 = 50_000_000;
