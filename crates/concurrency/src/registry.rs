//! Registry of in-flight blocking queries
//!
//! Maps caller-chosen request IDs to the [`CancelToken`] of the query running
//! under that ID, so a second caller can cancel it. The map sits behind a
//! single `RwLock` scoped to the map itself; only whole operations are
//! exposed (`set`, `get`, `delete`), never iteration under a held lock.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::debug;

use beacon_core::CancelToken;

/// Request ID → cancellation handle
#[derive(Debug, Default)]
pub struct QueryRegistry {
    queries: RwLock<FxHashMap<String, CancelToken>>,
}

impl QueryRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `token` under `id`, replacing any previous entry
    pub fn set(&self, id: impl Into<String>, token: CancelToken) {
        self.queries.write().insert(id.into(), token);
    }

    /// Token registered under `id`
    pub fn get(&self, id: &str) -> Option<CancelToken> {
        self.queries.read().get(id).cloned()
    }

    /// Remove and return the token registered under `id`
    pub fn delete(&self, id: &str) -> Option<CancelToken> {
        self.queries.write().remove(id)
    }

    /// Cancel the query registered under `id`
    ///
    /// Returns `false` if no query is registered under that ID. The token is
    /// cancelled after the registry lock is released.
    pub fn cancel(&self, id: &str) -> bool {
        match self.get(id) {
            Some(token) => {
                debug!(target: "beacon::registry", request_id = id, "cancelling query");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Register a fresh token under `id` for the lifetime of the guard
    ///
    /// Dropping the guard removes the entry, unless it has since been
    /// replaced by another registration under the same ID.
    pub fn register(&self, id: impl Into<String>) -> Registration<'_> {
        let id = id.into();
        let token = CancelToken::new();
        self.set(id.clone(), token.clone());
        Registration {
            registry: self,
            id,
            token,
        }
    }

    /// Number of registered queries
    pub fn len(&self) -> usize {
        self.queries.read().len()
    }

    /// Whether no query is registered
    pub fn is_empty(&self) -> bool {
        self.queries.read().is_empty()
    }
}

/// Scoped registration returned by [`QueryRegistry::register`]
#[derive(Debug)]
pub struct Registration<'a> {
    registry: &'a QueryRegistry,
    id: String,
    token: CancelToken,
}

impl Registration<'_> {
    /// Token the registered query should observe
    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// Request ID of the registration
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        let mut queries = self.registry.queries.write();
        if queries
            .get(&self.id)
            .map_or(false, |current| current.ptr_eq(&self.token))
        {
            queries.remove(&self.id);
        }
    }
}
