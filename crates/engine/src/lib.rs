//! Read endpoints for beacon
//!
//! This crate ties the lower layers into a serving surface:
//! - Server: state source, query limits, leadership view, query registry
//! - Resources: prefix lookup of jobs, evals, allocs and nodes
//! - QueryConfig: blocking-query limits loaded from `beacon.toml`
//! - Wire request/response shapes
//!
//! Every read goes through [`Server::blocking_rpc`], which applies the
//! configured wait limits before handing off to the blocking-query runner.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod resources;
pub mod rpc;
pub mod server;

pub use config::{QueryConfig, CONFIG_FILE_NAME};
pub use resources::{collect_matches, merge_matches, resolve_context, resource_iter, Resources};
pub use rpc::{ResourcesRequest, ResourcesResponse};
pub use server::{ClusterState, Server};
