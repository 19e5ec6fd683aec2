//! Core traits for the state store read path
//!
//! This module defines the IndexedView and SnapshotSource traits that let the
//! query layer run against any versioned store: the in-memory reference store
//! in `beacon-storage`, or a replicated store behind the same interface.

use std::sync::Arc;

use crate::error::Result;
use crate::types::{EntityContext, StateObject};
use crate::watch::WatchSet;

/// Forward-only iterator over the objects of one prefix scan
pub type ObjectIter<'a> = Box<dyn Iterator<Item = Arc<dyn StateObject>> + 'a>;

/// Read-only view of the state store at a fixed version
///
/// Reads never take a lock shared with writers; a view is immutable once
/// created.
pub trait IndexedView: Send + Sync {
    /// Iterate the objects of `context` whose ID starts with `prefix`
    ///
    /// Objects are yielded in ascending ID order. The scan registers the
    /// collection's change feed for `prefix` in `ws`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store cannot serve the scan.
    fn by_id_prefix(
        &self,
        ws: &mut WatchSet,
        context: EntityContext,
        prefix: &str,
    ) -> Result<ObjectIter<'_>>;

    /// Index of the last write to `context`'s collection
    ///
    /// # Errors
    ///
    /// Returns an error if the index table cannot be read.
    fn index(&self, context: EntityContext) -> Result<u64>;

    /// Highest index applied to the store as of this view
    fn current_index(&self) -> u64;
}

/// Producer of fresh [`IndexedView`]s
///
/// Blocking queries take a new view for every attempt so each retry observes
/// the writes that woke it.
pub trait SnapshotSource: Send + Sync {
    /// View type handed out by this source
    type View: IndexedView;

    /// Capture a view of the current state
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot produce a snapshot.
    fn snapshot(&self) -> Result<Self::View>;
}

impl<S: SnapshotSource + ?Sized> SnapshotSource for Arc<S> {
    type View = S::View;

    fn snapshot(&self) -> Result<Self::View> {
        (**self).snapshot()
    }
}
