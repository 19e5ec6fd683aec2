//! Entity kinds and the records stored in each collection
//!
//! The set of entity contexts is closed: `jobs`, `evals`, `allocs`, `nodes`.
//! Each context names a collection in the state store and the record type it
//! holds. Records expose their identifier through the [`Identified`]
//! capability; anything else stored in a collection is an opaque
//! [`StateObject`] that prefix lookups skip.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Entity collection addressed by a prefix lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityContext {
    /// Job specifications
    Jobs,
    /// Scheduler evaluations
    Evals,
    /// Allocations placed on nodes
    Allocs,
    /// Client nodes
    Nodes,
}

impl EntityContext {
    /// Every context, in declaration order
    pub const ALL: [EntityContext; 4] = [
        EntityContext::Jobs,
        EntityContext::Evals,
        EntityContext::Allocs,
        EntityContext::Nodes,
    ];

    /// Fan-out order for context-less lookups.
    ///
    /// The first context in this order with a non-empty match set supplies
    /// the response index.
    pub const PRIORITY: [EntityContext; 4] = [
        EntityContext::Allocs,
        EntityContext::Nodes,
        EntityContext::Jobs,
        EntityContext::Evals,
    ];

    /// Wire name of the context
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityContext::Jobs => "jobs",
            EntityContext::Evals => "evals",
            EntityContext::Allocs => "allocs",
            EntityContext::Nodes => "nodes",
        }
    }

    /// Dense position in [`EntityContext::ALL`], used for per-collection tables
    #[inline]
    pub fn ordinal(&self) -> usize {
        match self {
            EntityContext::Jobs => 0,
            EntityContext::Evals => 1,
            EntityContext::Allocs => 2,
            EntityContext::Nodes => 3,
        }
    }
}

impl fmt::Display for EntityContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityContext {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "jobs" => Ok(EntityContext::Jobs),
            "evals" => Ok(EntityContext::Evals),
            "allocs" => Ok(EntityContext::Allocs),
            "nodes" => Ok(EntityContext::Nodes),
            other => Err(Error::InvalidContext(other.to_string())),
        }
    }
}

/// Capability shared by every entity kind: a stable identifier
pub trait Identified {
    /// Full identifier of the record
    fn id(&self) -> &str;
}

/// Any object held in a state store collection
///
/// Only the known entity kinds return `Some` from [`StateObject::as_identified`].
pub trait StateObject: fmt::Debug + Send + Sync {
    /// Short type name, used in diagnostics
    fn kind(&self) -> &'static str;

    /// Identifier capability, if this object is a known entity kind
    fn as_identified(&self) -> Option<&dyn Identified> {
        None
    }
}

/// A known entity kind and the collection it lives in
pub trait Entity: Identified + StateObject + Sized + 'static {
    /// Collection holding records of this kind
    const CONTEXT: EntityContext;
}

macro_rules! entity_record {
    ($ty:ident, $kind:literal, $context:expr) => {
        impl Entity for $ty {
            const CONTEXT: EntityContext = $context;
        }

        impl Identified for $ty {
            #[inline]
            fn id(&self) -> &str {
                &self.id
            }
        }

        impl StateObject for $ty {
            fn kind(&self) -> &'static str {
                $kind
            }

            fn as_identified(&self) -> Option<&dyn Identified> {
                Some(self)
            }
        }
    };
}

/// A job registered with the orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Job identifier
    pub id: String,
    /// Human readable name
    pub name: String,
    /// Namespace the job was submitted to
    pub namespace: String,
    /// Lifecycle status (`pending`, `running`, `dead`)
    pub status: String,
}

impl Job {
    /// Create a pending job in the default namespace
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            namespace: "default".to_string(),
            status: "pending".to_string(),
        }
    }
}

/// A scheduler evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Evaluation identifier
    pub id: String,
    /// Job the evaluation was created for
    pub job_id: String,
    /// Evaluation status (`pending`, `complete`, `failed`)
    pub status: String,
    /// What caused the evaluation (`job-register`, `node-update`, ...)
    pub triggered_by: String,
}

impl Evaluation {
    /// Create a pending evaluation for a job registration
    pub fn new(id: impl Into<String>, job_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            job_id: job_id.into(),
            status: "pending".to_string(),
            triggered_by: "job-register".to_string(),
        }
    }
}

/// An allocation of a task group onto a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    /// Allocation identifier
    pub id: String,
    /// Evaluation that produced the allocation
    pub eval_id: String,
    /// Owning job
    pub job_id: String,
    /// Node the allocation was placed on
    pub node_id: String,
    /// Allocation name (`<job>.<group>[<index>]`)
    pub name: String,
    /// Client-reported status
    pub client_status: String,
}

impl Allocation {
    /// Create a pending allocation placed on `node_id`
    pub fn new(
        id: impl Into<String>,
        job_id: impl Into<String>,
        node_id: impl Into<String>,
    ) -> Self {
        let job_id = job_id.into();
        Self {
            id: id.into(),
            eval_id: String::new(),
            name: format!("{}.group[0]", job_id),
            job_id,
            node_id: node_id.into(),
            client_status: "pending".to_string(),
        }
    }
}

/// A client node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Node identifier
    pub id: String,
    /// Host name
    pub name: String,
    /// Datacenter the node belongs to
    pub datacenter: String,
    /// Node status (`initializing`, `ready`, `down`)
    pub status: String,
}

impl Node {
    /// Create a ready node in `dc1`
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            datacenter: "dc1".to_string(),
            status: "ready".to_string(),
        }
    }
}

entity_record!(Job, "job", EntityContext::Jobs);
entity_record!(Evaluation, "evaluation", EntityContext::Evals);
entity_record!(Allocation, "allocation", EntityContext::Allocs);
entity_record!(Node, "node", EntityContext::Nodes);

/// Extract the identifier of a stored object
///
/// Fails with [`Error::UnsupportedRecordType`] for objects that are not one
/// of the known entity kinds.
pub fn record_id(obj: &dyn StateObject) -> Result<&str, Error> {
    obj.as_identified()
        .map(|r| r.id())
        .ok_or(Error::UnsupportedRecordType(obj.kind()))
}

/// Generate a fresh UUID-formatted identifier
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
