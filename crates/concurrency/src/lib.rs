//! Concurrency layer for beacon
//!
//! This crate implements the blocking-query protocol:
//! - run_blocking: retry/suspend loop over successive snapshots
//! - BlockingOptions: minimum index, timeout and cancellation for one call
//! - QueryRegistry: RwLock-guarded map of in-flight queries by request ID
//!
//! Concurrent queries share nothing but the store they read; each call owns
//! its snapshot, watch set and wait.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod blocking;
pub mod registry;

pub use blocking::{run_blocking, BlockingOptions, QueryState};
pub use registry::{QueryRegistry, Registration};
