//! StateStore: in-memory versioned store of orchestrator entities
//!
//! This module implements the read path the query layer consumes using:
//! - `BTreeMap<String, Arc<dyn StateObject>>` per collection for ID-ordered prefix scans
//! - `parking_lot::RwLock` around the collection set
//! - `AtomicU64` for the highest applied index
//! - One `WatchChannel` per collection for change notification
//!
//! # Design Notes
//!
//! - **Caller-assigned indexes**: writes carry the index of the log entry
//!   that produced them; the store never allocates indexes itself
//! - **Copy-on-write collections**: a write copies a collection only while a
//!   snapshot still shares it
//! - **Notify after publish**: watch channels fire after the write lock is
//!   released, so a woken reader always sees the write

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use beacon_core::{Entity, EntityContext, Error, Result, SnapshotSource, StateObject, WatchChannel};

use crate::index::IndexTable;
use crate::snapshot::{Rows, StateSnapshot};

#[derive(Debug, Default)]
struct Tables {
    rows: [Arc<Rows>; 4],
    indexes: IndexTable,
}

/// A pending change to one ID: `Some` upserts, `None` deletes
type Change = (String, Option<Arc<dyn StateObject>>);

/// In-memory state store with snapshot reads and per-collection watches
///
/// Thread-safe: any number of readers and writers may share it behind an
/// `Arc`. Snapshot creation holds the read lock only long enough to clone
/// four `Arc`s.
///
/// # Example
///
/// ```
/// use beacon_core::{EntityContext, IndexedView, Job};
/// use beacon_storage::StateStore;
///
/// let store = StateStore::new();
/// store.upsert(10, Job::new("job-1")).unwrap();
///
/// let snapshot = store.create_snapshot();
/// assert_eq!(snapshot.index(EntityContext::Jobs).unwrap(), 10);
/// ```
pub struct StateStore {
    tables: RwLock<Tables>,
    channels: [Arc<WatchChannel>; 4],
    latest_index: AtomicU64,
}

impl StateStore {
    /// Create an empty store at index 0
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            channels: std::array::from_fn(|_| Arc::new(WatchChannel::new())),
            latest_index: AtomicU64::new(0),
        }
    }

    /// Highest index applied to any collection
    #[inline]
    pub fn latest_index(&self) -> u64 {
        self.latest_index.load(Ordering::SeqCst)
    }

    /// Last write index of `context`'s collection
    pub fn table_index(&self, context: EntityContext) -> u64 {
        self.tables.read().indexes.get(context)
    }

    /// Number of objects stored in `context`'s collection
    pub fn len(&self, context: EntityContext) -> usize {
        self.tables.read().rows[context.ordinal()].len()
    }

    /// Whether `context`'s collection is empty
    pub fn is_empty(&self, context: EntityContext) -> bool {
        self.len(context) == 0
    }

    /// Change feed of `context`'s collection
    pub fn channel(&self, context: EntityContext) -> &Arc<WatchChannel> {
        &self.channels[context.ordinal()]
    }

    /// Insert or replace an entity at `index`
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIndex`] if `index` is 0.
    pub fn upsert<E: Entity>(&self, index: u64, record: E) -> Result<()> {
        self.upsert_all(index, std::iter::once(record))
    }

    /// Insert or replace several entities of one kind at a single `index`
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIndex`] if `index` is 0.
    pub fn upsert_all<E: Entity>(
        &self,
        index: u64,
        records: impl IntoIterator<Item = E>,
    ) -> Result<()> {
        let changes = records
            .into_iter()
            .map(|record| {
                let id = record.id().to_string();
                let obj: Arc<dyn StateObject> = Arc::new(record);
                (id, Some(obj))
            })
            .collect();
        self.apply(E::CONTEXT, index, changes)
    }

    /// Insert or replace an arbitrary object under `id`
    ///
    /// Collections may hold objects that are not one of the known entity
    /// kinds; prefix lookups skip them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIndex`] if `index` is 0.
    pub fn upsert_object(
        &self,
        context: EntityContext,
        index: u64,
        id: impl Into<String>,
        obj: Arc<dyn StateObject>,
    ) -> Result<()> {
        self.apply(context, index, vec![(id.into(), Some(obj))])
    }

    /// Remove `id` from `context`'s collection at `index`
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the ID is absent, or
    /// [`Error::InvalidIndex`] if `index` is 0.
    pub fn delete(&self, context: EntityContext, index: u64, id: &str) -> Result<()> {
        self.apply(context, index, vec![(id.to_string(), None)])
    }

    /// Capture a point-in-time view of every collection
    ///
    /// The read lock is held while the collection `Arc`s, the index table and
    /// the channel generations are captured, so the three agree.
    pub fn create_snapshot(&self) -> StateSnapshot {
        let tables = self.tables.read();
        StateSnapshot {
            rows: tables.rows.clone(),
            indexes: tables.indexes,
            latest_index: tables.indexes.max(),
            channels: self.channels.clone(),
            generations: std::array::from_fn(|slot| self.channels[slot].generation()),
        }
    }

    /// Apply a batch of changes to one collection atomically
    ///
    /// All changes are validated before any is applied; a delete of a missing
    /// ID rejects the whole batch.
    fn apply(&self, context: EntityContext, index: u64, changes: Vec<Change>) -> Result<()> {
        if index == 0 {
            return Err(Error::InvalidIndex(index));
        }
        if changes.is_empty() {
            return Ok(());
        }

        let slot = context.ordinal();
        {
            let mut guard = self.tables.write();
            let tables = &mut *guard;

            for (id, obj) in &changes {
                if obj.is_none() && !tables.rows[slot].contains_key(id) {
                    return Err(Error::NotFound {
                        context,
                        id: id.clone(),
                    });
                }
            }

            let rows = Arc::make_mut(&mut tables.rows[slot]);
            for (id, obj) in &changes {
                match obj {
                    Some(obj) => {
                        rows.insert(id.clone(), Arc::clone(obj));
                    }
                    None => {
                        rows.remove(id);
                    }
                }
            }

            tables.indexes.bump(context, index);
            self.latest_index.fetch_max(index, Ordering::SeqCst);
        }

        let channel = &self.channels[slot];
        for (id, _) in &changes {
            channel.notify(id);
        }

        debug!(
            target: "beacon::store",
            context = %context,
            index,
            changes = changes.len(),
            "applied writes"
        );
        Ok(())
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateStore")
            .field("latest_index", &self.latest_index())
            .finish_non_exhaustive()
    }
}

impl SnapshotSource for StateStore {
    type View = StateSnapshot;

    fn snapshot(&self) -> Result<StateSnapshot> {
        Ok(self.create_snapshot())
    }
}
