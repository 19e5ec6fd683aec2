//! Per-collection write indexes
//!
//! Every write to a collection records the index it was applied at. The
//! table keeps the highest index seen per collection; it is what a lookup
//! reports as the consistency index of a single-context result.

use beacon_core::EntityContext;

/// Secondary index: EntityContext → last write index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexTable {
    indexes: [u64; 4],
}

impl IndexTable {
    /// Create a table with every collection at index 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Last write index of `context`, 0 if never written
    #[inline]
    pub fn get(&self, context: EntityContext) -> u64 {
        self.indexes[context.ordinal()]
    }

    /// Record a write to `context` at `index`
    ///
    /// Indexes only move forward; an older index leaves the entry unchanged.
    pub fn bump(&mut self, context: EntityContext, index: u64) {
        let slot = &mut self.indexes[context.ordinal()];
        *slot = (*slot).max(index);
    }

    /// Highest index across all collections
    pub fn max(&self) -> u64 {
        self.indexes.iter().copied().max().unwrap_or(0)
    }
}
