//! Resources endpoint: prefix lookups across entity collections
//!
//! A lookup runs in three steps per attempt of the blocking loop:
//! 1. **Resolve** each requested context to a prefix scan of its collection
//!    ([`resource_iter`]), registering the scan's watch.
//! 2. **Collect** at most `limit` identifiers from each scan, peeking one
//!    more to detect truncation ([`collect_matches`]).
//! 3. **Merge** the match sets and pick the response index
//!    ([`merge_matches`]).
//!
//! Contexts are always visited in [`EntityContext::PRIORITY`] order; the
//! index of a fan-out lookup comes from the first non-empty context in that
//! order, so it does not depend on map iteration order.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, trace};

use beacon_core::{
    record_id, EntityContext, IndexedView, MatchSet, ObjectIter, PrefixQuery, QueryMeta,
    QueryOptions, QueryResponse, Result, SnapshotSource, StateObject, WatchSet, TRUNCATE_LIMIT,
};

use crate::rpc::{ResourcesRequest, ResourcesResponse};
use crate::server::Server;

/// Parse a wire context name; the empty string selects every context
///
/// # Errors
///
/// Returns [`beacon_core::Error::InvalidContext`] for names outside the
/// closed set.
pub fn resolve_context(name: &str) -> Result<Option<EntityContext>> {
    if name.is_empty() {
        Ok(None)
    } else {
        name.parse().map(Some)
    }
}

/// Prefix scan of `context`'s collection
///
/// Registers the collection's watch for `prefix` in `ws`.
///
/// # Errors
///
/// Propagates store read failures unchanged.
pub fn resource_iter<'v, V>(
    context: EntityContext,
    prefix: &str,
    ws: &mut WatchSet,
    view: &'v V,
) -> Result<ObjectIter<'v>>
where
    V: IndexedView + ?Sized,
{
    view.by_id_prefix(ws, context, prefix)
}

/// Drain up to `limit` identifiers from `iter`
///
/// Objects that are not a known entity kind are skipped and do not count
/// toward `limit`. After `limit` identifiers, the scan continues to the next
/// recognized record to decide truncation and drops it; unknown objects met
/// on the way are skipped too. Memory stays at `limit + 1` regardless of the
/// collection size.
pub fn collect_matches<I>(iter: I, limit: usize) -> MatchSet
where
    I: Iterator<Item = Arc<dyn StateObject>>,
{
    let mut recognized = iter.filter_map(|obj| match record_id(obj.as_ref()) {
        Ok(id) => Some(id.to_string()),
        Err(e) => {
            trace!(target: "beacon::resources", error = %e, "skipping record");
            None
        }
    });

    let ids: Vec<String> = recognized.by_ref().take(limit).collect();
    let truncated = recognized.next().is_some();
    MatchSet { ids, truncated }
}

/// Run `query` against one snapshot and merge the per-context results
///
/// All-or-nothing: any error aborts the merge and no response is built.
///
/// # Errors
///
/// Propagates store read failures unchanged.
pub fn merge_matches<V>(
    query: &PrefixQuery,
    ws: &mut WatchSet,
    view: &V,
    limit: usize,
) -> Result<QueryResponse>
where
    V: IndexedView + ?Sized,
{
    let mut matches = BTreeMap::new();
    for &context in query.contexts() {
        let iter = resource_iter(context, &query.prefix, ws, view)?;
        matches.insert(context, collect_matches(iter, limit));
    }

    let index = match query.context {
        Some(context) => view.index(context)?,
        None => fan_out_index(query, &matches, view)?,
    };

    Ok(QueryResponse {
        matches,
        index,
        known_leader: false,
    })
}

/// Index of a fan-out lookup
///
/// The first non-empty context in priority order supplies the index; with no
/// matches at all the store's current index is used. If that index is not
/// past the caller's `min_index` but some scanned collection has moved past
/// it, the highest scanned collection index is reported instead. A priority
/// context that just emptied then still completes the wait, and the index
/// never falls below one the caller already holds.
fn fan_out_index<V>(
    query: &PrefixQuery,
    matches: &BTreeMap<EntityContext, MatchSet>,
    view: &V,
) -> Result<u64>
where
    V: IndexedView + ?Sized,
{
    let first_non_empty = query
        .contexts()
        .iter()
        .find(|context| matches.get(*context).map_or(false, |m| !m.is_empty()));
    let selected = match first_non_empty {
        Some(&context) => view.index(context)?,
        None => view.current_index(),
    };
    if selected > query.min_index {
        return Ok(selected);
    }

    let mut highest = selected;
    for &context in query.contexts() {
        highest = highest.max(view.index(context)?);
    }
    Ok(if highest > query.min_index {
        highest
    } else {
        selected
    })
}

/// Resources endpoint bound to a server
#[derive(Debug)]
pub struct Resources<'a, S> {
    srv: &'a Server<S>,
}

impl<'a, S: SnapshotSource> Resources<'a, S> {
    pub(crate) fn new(srv: &'a Server<S>) -> Self {
        Self { srv }
    }

    /// List the identifiers matching a wire request
    ///
    /// # Errors
    ///
    /// Returns `InvalidContext` for an unknown context before any read,
    /// `Cancelled` if the request was cancelled by ID, or the store's error.
    pub fn list(&self, args: &ResourcesRequest) -> Result<ResourcesResponse> {
        let context = resolve_context(&args.context)?;
        let query = PrefixQuery {
            context,
            prefix: args.prefix.clone(),
            min_index: args.query_options.min_query_index,
            timeout: args.query_options.max_query_time,
        };

        let response = self.run(&query, &args.query_options)?;
        let mut meta = QueryMeta {
            index: response.index,
            ..QueryMeta::default()
        };
        self.srv.set_query_meta(&mut meta);
        Ok(ResourcesResponse::from_parts(response, meta))
    }

    /// Run a typed prefix lookup under the blocking-query protocol
    ///
    /// # Errors
    ///
    /// Returns the store's error unchanged.
    pub fn query(&self, query: &PrefixQuery) -> Result<QueryResponse> {
        let opts = QueryOptions {
            min_query_index: query.min_index,
            max_query_time: query.timeout,
            request_id: None,
        };
        self.run(query, &opts)
    }

    fn run(&self, query: &PrefixQuery, opts: &QueryOptions) -> Result<QueryResponse> {
        debug!(
            target: "beacon::resources",
            context = ?query.context,
            prefix = %query.prefix,
            min_index = query.min_index,
            "listing resources"
        );

        self.srv.blocking_rpc(opts, |ws, view| {
            let mut response = merge_matches(query, ws, view, TRUNCATE_LIMIT)?;
            response.known_leader = self.srv.cluster().known_leader();
            Ok(response)
        })
    }
}
