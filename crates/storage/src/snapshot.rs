//! StateSnapshot: immutable point-in-time view of the state store
//!
//! A snapshot shares the store's collection maps by `Arc`. Writers that run
//! after the snapshot was taken copy the affected collection before mutating
//! it, so a snapshot never changes and reads from it take no lock.
//!
//! # Design Notes
//!
//! - **Cheap to create**: four `Arc` clones plus the index table
//! - **Thread-safe**: `Send + Sync`, may be read from any thread
//! - **Watch-aware**: prefix scans register the collection's change feed
//!   together with the generation the snapshot was taken at

use std::collections::BTreeMap;
use std::sync::Arc;

use beacon_core::{
    EntityContext, IndexedView, ObjectIter, Result, StateObject, WatchChannel, WatchSet,
};

use crate::index::IndexTable;

/// One collection: ID → stored object, ordered by ID
pub type Rows = BTreeMap<String, Arc<dyn StateObject>>;

/// A read-only view of the store at a fixed index
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    pub(crate) rows: [Arc<Rows>; 4],
    pub(crate) indexes: IndexTable,
    pub(crate) latest_index: u64,
    pub(crate) channels: [Arc<WatchChannel>; 4],
    pub(crate) generations: [u64; 4],
}

impl StateSnapshot {
    /// Number of objects in `context`'s collection
    pub fn len(&self, context: EntityContext) -> usize {
        self.rows[context.ordinal()].len()
    }

    /// Whether `context`'s collection is empty
    pub fn is_empty(&self, context: EntityContext) -> bool {
        self.rows[context.ordinal()].is_empty()
    }

    /// Look up one object by full ID
    pub fn get(&self, context: EntityContext, id: &str) -> Option<Arc<dyn StateObject>> {
        self.rows[context.ordinal()].get(id).cloned()
    }
}

impl IndexedView for StateSnapshot {
    fn by_id_prefix(
        &self,
        ws: &mut WatchSet,
        context: EntityContext,
        prefix: &str,
    ) -> Result<ObjectIter<'_>> {
        let slot = context.ordinal();
        ws.add(&self.channels[slot], prefix, self.generations[slot]);

        let prefix = prefix.to_string();
        let iter = self.rows[slot]
            .range(prefix.clone()..)
            .take_while(move |(id, _)| id.starts_with(prefix.as_str()))
            .map(|(_, obj)| Arc::clone(obj));
        Ok(Box::new(iter))
    }

    fn index(&self, context: EntityContext) -> Result<u64> {
        Ok(self.indexes.get(context))
    }

    fn current_index(&self) -> u64 {
        self.latest_index
    }
}
