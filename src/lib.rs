//! Beacon - blocking prefix lookups over orchestrator state
//!
//! Beacon answers "which jobs, evaluations, allocations or nodes have an ID
//! starting with this prefix?" against a versioned state store, optionally
//! holding the request open until the answer changes.
//!
//! # Quick Start
//!
//! ```ignore
//! use beacon::{QueryConfig, ResourcesRequest, Server, StateStore, Job};
//! use std::sync::Arc;
//!
//! let store = Arc::new(StateStore::new());
//! store.upsert(1, Job::new("job-1"))?;
//!
//! let server = Server::new(store, QueryConfig::default())?;
//! let resp = server.resources().list(&ResourcesRequest::new("jobs", "job"))?;
//! assert_eq!(resp.matches["jobs"], vec!["job-1"]);
//! ```
//!
//! # Architecture
//!
//! - `beacon-core`: records, contexts, errors, watch primitives
//! - `beacon-storage`: copy-on-write state store and snapshots
//! - `beacon-concurrency`: blocking-query runner and query registry
//! - `beacon-engine`: server, resources endpoint, configuration

pub use beacon_concurrency::{run_blocking, BlockingOptions, QueryRegistry, QueryState};
pub use beacon_core::*;
pub use beacon_engine::*;
pub use beacon_storage::{StateSnapshot, StateStore};
