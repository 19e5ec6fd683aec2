//! Change notification for blocking reads
//!
//! A read registers one [`WatchSet`] entry per prefix scan it performs. Each
//! entry records the collection's [`WatchChannel`], the scanned prefix and the
//! channel generation observed by the snapshot that served the scan. A
//! suspended query waits on the set; it wakes when a writer touches an ID
//! under any registered prefix, when the deadline passes, or when its
//! [`CancelToken`] fires.
//!
//! # Lost wakeups
//!
//! Writers bump the channel generation before waking subscribers. A waiter
//! subscribes first and checks generations second, so a write landing between
//! the snapshot and the subscription is seen as a change. Such a change may
//! be outside the watched prefix; the caller simply re-runs its read.
//!
//! # Resource release
//!
//! Subscriptions are held by drop guards that live only for the duration of
//! [`WatchSet::watch`]. Every exit path (change, timeout, cancellation)
//! unsubscribes.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::trace;

/// Why a watch returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// Data under a watched prefix changed
    Changed,
    /// The deadline passed without a change
    TimedOut,
    /// The caller cancelled the wait
    Cancelled,
}

/// One-shot wake cell shared by every subscription of a single wait
#[derive(Debug)]
struct Waiter {
    wake: Mutex<Option<WatchOutcome>>,
    cond: Condvar,
}

impl Waiter {
    fn new() -> Self {
        Self {
            wake: Mutex::new(None),
            cond: Condvar::new(),
        }
    }

    /// First outcome wins; later fires are ignored
    fn fire(&self, outcome: WatchOutcome) {
        let mut wake = self.wake.lock();
        if wake.is_none() {
            *wake = Some(outcome);
        }
        self.cond.notify_all();
    }

    /// Wait for a fire, or until `deadline`; `None` waits without a bound
    fn wait_until(&self, deadline: Option<Instant>) -> WatchOutcome {
        let mut wake = self.wake.lock();
        loop {
            if let Some(outcome) = *wake {
                return outcome;
            }
            match deadline {
                Some(deadline) => {
                    if self.cond.wait_until(&mut wake, deadline).timed_out() {
                        return wake.unwrap_or(WatchOutcome::TimedOut);
                    }
                }
                None => self.cond.wait(&mut wake),
            }
        }
    }
}

#[derive(Debug)]
struct Subscriber {
    prefix: String,
    waiter: Arc<Waiter>,
}

/// Change feed for one collection
///
/// Owned by the store, shared with every snapshot it hands out.
#[derive(Debug, Default)]
pub struct WatchChannel {
    generation: AtomicU64,
    next_id: AtomicU64,
    subscribers: Mutex<FxHashMap<u64, Subscriber>>,
}

impl WatchChannel {
    /// Create a channel at generation 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of writes announced on this channel
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Announce a write to `id`
    ///
    /// Must be called after the write is visible to new snapshots. Wakes every
    /// waiter whose watched prefix is a prefix of `id`.
    pub fn notify(&self, id: &str) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let subscribers = self.subscribers.lock();
        for sub in subscribers.values() {
            if id.starts_with(sub.prefix.as_str()) {
                sub.waiter.fire(WatchOutcome::Changed);
            }
        }
    }

    /// Number of waits currently subscribed
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    fn subscribe(self: &Arc<Self>, prefix: &str, waiter: &Arc<Waiter>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.lock().insert(
            id,
            Subscriber {
                prefix: prefix.to_string(),
                waiter: Arc::clone(waiter),
            },
        );
        Subscription {
            channel: Arc::clone(self),
            id,
        }
    }
}

struct Subscription {
    channel: Arc<WatchChannel>,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.channel.subscribers.lock().remove(&self.id);
    }
}

#[derive(Debug)]
struct WatchEntry {
    channel: Arc<WatchChannel>,
    prefix: String,
    observed: u64,
}

/// Everything a single read attempt depended on
#[derive(Debug, Default)]
pub struct WatchSet {
    entries: SmallVec<[WatchEntry; 4]>,
}

impl WatchSet {
    /// Create an empty watch set
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dependency on `prefix` within `channel`'s collection
    ///
    /// `observed` is the channel generation captured with the snapshot that
    /// served the read.
    pub fn add(&mut self, channel: &Arc<WatchChannel>, prefix: &str, observed: u64) {
        self.entries.push(WatchEntry {
            channel: Arc::clone(channel),
            prefix: prefix.to_string(),
            observed,
        });
    }

    /// Number of registered dependencies
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Block until a dependency changes, `deadline` passes, or `cancel` fires
    ///
    /// An empty set waits for the deadline or cancellation only. A `None`
    /// deadline never times out.
    pub fn watch(&self, deadline: Option<Instant>, cancel: Option<&CancelToken>) -> WatchOutcome {
        let waiter = Arc::new(Waiter::new());

        let _subscriptions: SmallVec<[Subscription; 4]> = self
            .entries
            .iter()
            .map(|entry| entry.channel.subscribe(&entry.prefix, &waiter))
            .collect();
        let _registration = cancel.map(|token| token.register(&waiter));

        if cancel.map_or(false, CancelToken::is_cancelled) {
            return WatchOutcome::Cancelled;
        }
        if self
            .entries
            .iter()
            .any(|entry| entry.channel.generation() != entry.observed)
        {
            trace!(target: "beacon::watch", "change landed before subscription");
            return WatchOutcome::Changed;
        }

        waiter.wait_until(deadline)
    }
}

#[derive(Debug, Default)]
struct CancelInner {
    cancelled: AtomicBool,
    next_id: AtomicU64,
    waiters: Mutex<FxHashMap<u64, Arc<Waiter>>>,
}

/// External cancellation signal for a blocking query
///
/// Clones share state; cancelling any clone cancels them all. Cancellation is
/// sticky.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

impl CancelToken {
    /// Create an uncancelled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel, waking any wait currently suspended on this token
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        let waiters = self.inner.waiters.lock();
        trace!(target: "beacon::watch", waiters = waiters.len(), "cancelling");
        for waiter in waiters.values() {
            waiter.fire(WatchOutcome::Cancelled);
        }
    }

    /// Whether [`CancelToken::cancel`] has been called
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Whether `other` is a clone of this token
    pub fn ptr_eq(&self, other: &CancelToken) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn register(&self, waiter: &Arc<Waiter>) -> CancelRegistration {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.waiters.lock().insert(id, Arc::clone(waiter));
        CancelRegistration {
            inner: Arc::clone(&self.inner),
            id,
        }
    }

    #[cfg(test)]
    fn registered(&self) -> usize {
        self.inner.waiters.lock().len()
    }
}

struct CancelRegistration {
    inner: Arc<CancelInner>,
    id: u64,
}

impl Drop for CancelRegistration {
    fn drop(&mut self) {
        self.inner.waiters.lock().remove(&self.id);
    }
}
