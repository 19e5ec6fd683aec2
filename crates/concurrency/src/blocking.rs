//! Blocking query runner
//!
//! Runs a read function against successive snapshots until its result index
//! moves past the caller's minimum index, the wait times out, or the caller
//! cancels.
//!
//! # State machine
//!
//! ```text
//!            ┌──────────── watch fired ────────────┐
//!            v                                     │
//!        Running ── index > min_index ──> Completed│
//!            │  └── query error ────────> Completed│
//!            └── index <= min_index ──> Suspended ─┘
//!                                          │  └── timeout ──> Completed (last response)
//!                                          └───── cancel ──> Cancelled
//! ```
//!
//! Each attempt owns a fresh snapshot and a fresh [`WatchSet`]. The snapshot
//! is dropped before suspending, and the watch subscriptions are released on
//! every exit from [`WatchSet::watch`], so nothing outlives the call.

use std::time::{Duration, Instant};

use tracing::{debug, trace};

use beacon_core::{
    CancelToken, Error, Indexed, Result, SnapshotSource, WatchOutcome, WatchSet,
};

/// Lifecycle of a blocking query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    /// Executing the read against a snapshot
    Running,
    /// Waiting for a watched change, the deadline, or cancellation
    Suspended,
    /// Returned a response or a query error
    Completed,
    /// The caller withdrew interest
    Cancelled,
}

/// Blocking parameters for one call
#[derive(Debug, Clone, Default)]
pub struct BlockingOptions {
    /// Index the caller already has; 0 runs the query once without blocking
    pub min_index: u64,
    /// Maximum total time spent suspended
    pub timeout: Duration,
    /// External cancellation signal
    pub cancel: Option<CancelToken>,
}

impl BlockingOptions {
    /// Options for a call that blocks past `min_index` for up to `timeout`
    pub fn new(min_index: u64, timeout: Duration) -> Self {
        Self {
            min_index,
            timeout,
            cancel: None,
        }
    }

    /// Attach a cancellation token
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Whether the caller asked to block at all
    pub fn is_blocking(&self) -> bool {
        self.min_index > 0
    }
}

/// Run `query` under the blocking-query protocol
///
/// `query` receives a fresh [`WatchSet`] and snapshot on every attempt and
/// must register every read it performs in the set. Query errors end the
/// call immediately and are never retried here.
///
/// A `min_index` ahead of the store is not an error: the call waits for the
/// store to catch up or for the timeout. A timeout too large to represent as
/// a deadline waits without one.
///
/// # Errors
///
/// Returns the query's or the snapshot source's error unchanged, or
/// [`Error::Cancelled`] if `opts.cancel` fires first.
pub fn run_blocking<S, T, F>(source: &S, opts: &BlockingOptions, mut query: F) -> Result<T>
where
    S: SnapshotSource + ?Sized,
    T: Indexed,
    F: FnMut(&mut WatchSet, &S::View) -> Result<T>,
{
    let deadline = Instant::now().checked_add(opts.timeout);
    let cancel = opts.cancel.as_ref();
    let mut attempt: u32 = 0;

    loop {
        if cancel.map_or(false, CancelToken::is_cancelled) {
            debug!(target: "beacon::blocking", state = ?QueryState::Cancelled, attempt, "cancelled before run");
            return Err(Error::Cancelled);
        }

        attempt += 1;
        trace!(target: "beacon::blocking", state = ?QueryState::Running, attempt, "running query");

        let mut ws = WatchSet::new();
        let result = source
            .snapshot()
            .and_then(|view| query(&mut ws, &view));
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                debug!(target: "beacon::blocking", state = ?QueryState::Completed, error = %e, "query failed");
                return Err(e);
            }
        };

        let index = response.index();
        if !opts.is_blocking() || index > opts.min_index {
            trace!(target: "beacon::blocking", state = ?QueryState::Completed, index, attempt, "query complete");
            return Ok(response);
        }

        debug!(
            target: "beacon::blocking",
            state = ?QueryState::Suspended,
            min_index = opts.min_index,
            index,
            watches = ws.len(),
            attempt,
            "suspending query"
        );

        match ws.watch(deadline, cancel) {
            WatchOutcome::Changed => {
                trace!(target: "beacon::blocking", attempt, "watch fired");
            }
            WatchOutcome::TimedOut => {
                debug!(target: "beacon::blocking", state = ?QueryState::Completed, index, attempt, "wait timed out");
                return Ok(response);
            }
            WatchOutcome::Cancelled => {
                debug!(target: "beacon::blocking", state = ?QueryState::Cancelled, attempt, "cancelled while suspended");
                return Err(Error::Cancelled);
            }
        }
    }
}
