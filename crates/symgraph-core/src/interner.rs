//! # Scoped String Interner
//!
//! Deduplicates path components and member names while a graph is loaded.
//!
//! An interner belongs to one load operation: create it, pass it by
//! reference into the loader, and drop it (or keep it for the next load of
//! the same dataset). Nothing is shared process-wide, so memory is released
//! with the interner and separate loads never interfere.

use std::collections::BTreeSet;
use std::sync::Arc;

/// Shares one allocation per distinct string.
#[derive(Debug, Default, Clone)]
pub struct Interner {
    strings: BTreeSet<Arc<str>>,
}

impl Interner {
    /// Create an empty interner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the shared copy of `s`, allocating it on first sight.
    pub fn intern(&mut self, s: &str) -> Arc<str> {
        if let Some(existing) = self.strings.get(s) {
            return Arc::clone(existing);
        }
        let shared: Arc<str> = Arc::from(s);
        self.strings.insert(Arc::clone(&shared));
        shared
    }

    /// Number of distinct strings held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}
