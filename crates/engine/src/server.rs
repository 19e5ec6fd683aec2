//! Server-side plumbing shared by read endpoints
//!
//! A [`Server`] owns the state source, the query limits, the view of cluster
//! leadership and the registry of in-flight blocking queries. Endpoints such
//! as [`Resources`] borrow it for the duration of a call.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::{debug, info};

use beacon_concurrency::{run_blocking, BlockingOptions, QueryRegistry};
use beacon_core::{Indexed, QueryMeta, QueryOptions, Result, SnapshotSource, WatchSet};
use beacon_storage::StateStore;

use crate::config::{QueryConfig, CONFIG_FILE_NAME};
use crate::resources::Resources;

#[derive(Debug, Default)]
struct LeaderInfo {
    is_leader: bool,
    leader: Option<String>,
    last_contact: Option<Instant>,
}

/// This node's view of cluster leadership
#[derive(Debug, Default)]
pub struct ClusterState {
    inner: RwLock<LeaderInfo>,
}

impl ClusterState {
    /// No leader known, never contacted
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current leader; `is_leader` marks this node as leader
    pub fn set_leader(&self, is_leader: bool, leader: Option<String>) {
        let mut info = self.inner.write();
        info.is_leader = is_leader;
        info.leader = leader;
    }

    /// Note that the leader was heard from just now
    pub fn record_contact(&self) {
        self.inner.write().last_contact = Some(Instant::now());
    }

    /// Whether this node is the leader
    pub fn is_leader(&self) -> bool {
        self.inner.read().is_leader
    }

    /// Whether any leader is known, this node included
    pub fn known_leader(&self) -> bool {
        let info = self.inner.read();
        info.is_leader || info.leader.is_some()
    }

    /// Address of the known leader
    pub fn leader(&self) -> Option<String> {
        self.inner.read().leader.clone()
    }

    /// Time since the leader was last heard from; zero if never
    pub fn last_contact(&self) -> Duration {
        self.inner
            .read()
            .last_contact
            .map_or(Duration::ZERO, |at| at.elapsed())
    }
}

/// Read-side server state
#[derive(Debug)]
pub struct Server<S = StateStore> {
    state: Arc<S>,
    config: QueryConfig,
    cluster: ClusterState,
    registry: QueryRegistry,
}

impl<S: SnapshotSource> Server<S> {
    /// Create a server over `state` with validated limits
    ///
    /// # Errors
    ///
    /// Returns `Config` if `config` fails validation.
    pub fn new(state: Arc<S>, config: QueryConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            state,
            config,
            cluster: ClusterState::new(),
            registry: QueryRegistry::new(),
        })
    }

    /// Create a server with limits read from `beacon.toml` in `data_dir`
    ///
    /// The file is created with defaults if it does not exist.
    pub fn open(data_dir: &Path, state: Arc<S>) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE_NAME);
        QueryConfig::write_default_if_missing(&path)?;
        let config = QueryConfig::from_file(&path)?;
        info!(
            target: "beacon::server",
            path = %path.display(),
            max_query_time_ms = config.max_query_time_ms,
            default_query_time_ms = config.default_query_time_ms,
            "loaded query config"
        );
        Self::new(state, config)
    }

    /// State source the endpoints read
    pub fn state(&self) -> &Arc<S> {
        &self.state
    }

    /// Blocking-query limits in effect
    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Leadership view used for response metadata
    pub fn cluster(&self) -> &ClusterState {
        &self.cluster
    }

    /// In-flight queries registered by request ID
    pub fn registry(&self) -> &QueryRegistry {
        &self.registry
    }

    /// Resources endpoint
    pub fn resources(&self) -> Resources<'_, S> {
        Resources::new(self)
    }

    /// Run `query` as a blocking read described by `opts`
    ///
    /// The requested wait is normalized by [`QueryConfig::effective_wait`].
    /// With a `request_id`, the query is registered for the duration of the
    /// call and can be stopped with [`Server::cancel_query`].
    ///
    /// # Errors
    ///
    /// Returns the query's error, or `Cancelled`.
    pub fn blocking_rpc<T, F>(&self, opts: &QueryOptions, query: F) -> Result<T>
    where
        T: Indexed,
        F: FnMut(&mut WatchSet, &S::View) -> Result<T>,
    {
        let registration = opts
            .request_id
            .as_deref()
            .map(|id| self.registry.register(id));

        let mut blocking = BlockingOptions::new(opts.min_query_index, Duration::ZERO);
        if blocking.is_blocking() {
            blocking.timeout = self.config.effective_wait(opts.max_query_time);
        }
        if let Some(reg) = &registration {
            blocking = blocking.with_cancel(reg.token().clone());
        }

        run_blocking(self.state.as_ref(), &blocking, query)
    }

    /// Fill the leadership fields of `meta`
    pub fn set_query_meta(&self, meta: &mut QueryMeta) {
        if self.cluster.is_leader() {
            meta.last_contact = Duration::ZERO;
            meta.known_leader = true;
        } else {
            meta.last_contact = self.cluster.last_contact();
            meta.known_leader = self.cluster.known_leader();
        }
    }

    /// Cancel the blocking query registered under `id`
    ///
    /// Returns `false` if no such query is running.
    pub fn cancel_query(&self, id: &str) -> bool {
        let found = self.registry.cancel(id);
        debug!(target: "beacon::server", request_id = id, found, "cancel requested");
        found
    }
}
