//! Storage layer for beacon
//!
//! This crate implements the reference state store the query layer reads:
//! - StateStore: one ID-ordered `BTreeMap` per entity collection behind a RwLock
//! - StateSnapshot: immutable `Arc`-shared view implementing `IndexedView`
//! - IndexTable: last write index per collection
//! - One watch channel per collection, fired after every write
//!
//! The store has no durability and no replication; a replicated store plugs
//! into the query layer through the same `SnapshotSource` trait.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod index;
pub mod snapshot;
pub mod store;

pub use index::IndexTable;
pub use snapshot::{Rows, StateSnapshot};
pub use store::StateStore;
