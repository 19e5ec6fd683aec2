//! Core types and traits for Beacon
//!
//! This crate defines the foundational types used throughout the system:
//! - EntityContext: the closed set of collections a prefix lookup can address
//! - Job, Evaluation, Allocation, Node: entity records and their `Identified` capability
//! - PrefixQuery, MatchSet, QueryResponse: transient lookup values
//! - QueryOptions, QueryMeta: blocking parameters and response metadata
//! - WatchSet, WatchChannel, CancelToken: change notification for blocking reads
//! - Error: Error type hierarchy
//! - Traits: Core trait definitions (IndexedView, SnapshotSource)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod contract;
pub mod error;
pub mod limits;
pub mod traits;
pub mod types;
pub mod watch;

pub use contract::{Indexed, MatchSet, PrefixQuery, QueryMeta, QueryOptions, QueryResponse};
pub use error::{Error, Result};
pub use limits::TRUNCATE_LIMIT;
pub use traits::{IndexedView, ObjectIter, SnapshotSource};
pub use types::{
    generate_id, record_id, Allocation, Entity, EntityContext, Evaluation, Identified, Job, Node,
    StateObject,
};
pub use watch::{CancelToken, WatchChannel, WatchOutcome, WatchSet};
