//! Request and response values for prefix lookups
//!
//! All types here are transient: built per request, never mutated after
//! construction, never persisted.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::EntityContext;

/// Values that report the consistency index they were read at
pub trait Indexed {
    /// Consistency index of the value
    fn index(&self) -> u64;
}

/// A prefix lookup, optionally restricted to one context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixQuery {
    /// Context to search; `None` fans out to every context
    pub context: Option<EntityContext>,
    /// Identifier prefix, matched byte-wise
    pub prefix: String,
    /// Index the caller already has; 0 disables blocking
    pub min_index: u64,
    /// Upper bound on the time spent suspended
    pub timeout: Duration,
}

impl PrefixQuery {
    /// Non-blocking lookup
    pub fn new(context: Option<EntityContext>, prefix: impl Into<String>) -> Self {
        Self {
            context,
            prefix: prefix.into(),
            min_index: 0,
            timeout: Duration::ZERO,
        }
    }

    /// Make the lookup block until the result index exceeds `min_index`
    pub fn blocking(mut self, min_index: u64, timeout: Duration) -> Self {
        self.min_index = min_index;
        self.timeout = timeout;
        self
    }

    /// Contexts this query scans, in fan-out priority order
    pub fn contexts(&self) -> &[EntityContext] {
        match &self.context {
            Some(ctx) => std::slice::from_ref(ctx),
            None => &EntityContext::PRIORITY,
        }
    }
}

/// Matches found in one context
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSet {
    /// Matching identifiers in collection order
    pub ids: Vec<String>,
    /// More identifiers matched than were returned
    pub truncated: bool,
}

impl MatchSet {
    /// Whether no identifier matched
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Merged result of a prefix lookup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResponse {
    /// Match set per scanned context
    pub matches: BTreeMap<EntityContext, MatchSet>,
    /// Consistency index summarizing the whole response
    pub index: u64,
    /// Whether the serving node knew of a cluster leader
    pub known_leader: bool,
}

impl Indexed for QueryResponse {
    fn index(&self) -> u64 {
        self.index
    }
}

/// Blocking parameters attached to every read request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOptions {
    /// Return only once the result index exceeds this value
    #[serde(default, alias = "minIndex")]
    pub min_query_index: u64,
    /// Requested maximum suspension time; zero selects the server default
    #[serde(default, alias = "maxWaitTime", with = "duration_millis")]
    pub max_query_time: Duration,
    /// Caller-chosen identifier under which the query can be cancelled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Metadata returned alongside every read response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryMeta {
    /// Consistency index of the result
    pub index: u64,
    /// Time since the serving node last heard from the leader
    #[serde(with = "duration_millis")]
    pub last_contact: Duration,
    /// Whether the serving node knew of a cluster leader
    pub known_leader: bool,
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
