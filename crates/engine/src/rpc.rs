//! Wire shapes of the resources endpoint
//!
//! Context keys on the wire are the lowercase context names. A request with
//! an empty `context` searches every context.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use beacon_core::{generate_id, QueryMeta, QueryOptions, QueryResponse};

/// Prefix lookup request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcesRequest {
    /// Context name, or empty for all contexts
    #[serde(default)]
    pub context: String,
    /// Identifier prefix; empty matches everything
    #[serde(default)]
    pub prefix: String,
    /// Blocking parameters
    #[serde(flatten)]
    pub query_options: QueryOptions,
}

impl ResourcesRequest {
    /// Non-blocking lookup of `prefix` in `context` (empty for all)
    pub fn new(context: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            prefix: prefix.into(),
            query_options: QueryOptions::default(),
        }
    }

    /// Block until the result index passes `min_index`, for at most `wait`
    pub fn blocking(mut self, min_index: u64, wait: std::time::Duration) -> Self {
        self.query_options.min_query_index = min_index;
        self.query_options.max_query_time = wait;
        self
    }

    /// Register the request under `id` so it can be cancelled
    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.query_options.request_id = Some(id.into());
        self
    }

    /// Register the request under a generated ID unless it already has one
    ///
    /// Read the ID back with [`ResourcesRequest::request_id`] to cancel it.
    pub fn cancellable(mut self) -> Self {
        if self.query_options.request_id.is_none() {
            self.query_options.request_id = Some(generate_id());
        }
        self
    }

    /// ID the request is registered under while it runs
    pub fn request_id(&self) -> Option<&str> {
        self.query_options.request_id.as_deref()
    }
}

/// Prefix lookup response
///
/// `matches` and `truncations` carry the same key set: every context that
/// was searched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcesResponse {
    /// Context name → matching identifiers, in ID order
    pub matches: BTreeMap<String, Vec<String>>,
    /// Context name → whether more identifiers matched than were returned
    pub truncations: BTreeMap<String, bool>,
    /// Index and leadership metadata
    #[serde(flatten)]
    pub query_meta: QueryMeta,
}

impl ResourcesResponse {
    pub(crate) fn from_parts(response: QueryResponse, query_meta: QueryMeta) -> Self {
        let mut matches = BTreeMap::new();
        let mut truncations = BTreeMap::new();
        for (context, set) in response.matches {
            let key = context.as_str().to_string();
            truncations.insert(key.clone(), set.truncated);
            matches.insert(key, set.ids);
        }
        Self {
            matches,
            truncations,
            query_meta,
        }
    }

    /// Consistency index of the response
    pub fn index(&self) -> u64 {
        self.query_meta.index
    }
}
