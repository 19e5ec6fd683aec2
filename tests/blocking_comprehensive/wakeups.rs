//! Waits ended by a watched write

use crate::common::*;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn write_after(
    store: &Arc<StateStore>,
    delay: Duration,
    f: impl FnOnce(&StateStore) + Send + 'static,
) -> thread::JoinHandle<()> {
    let store = Arc::clone(store);
    thread::spawn(move || {
        thread::sleep(delay);
        f(&store);
    })
}

#[test]
fn matching_write_wakes_the_waiter() {
    let ts = TestServer::new();
    let index = ts.seed_jobs(1, 3, 1);

    let writer = write_after(&ts.store, Duration::from_millis(50), move |store| {
        store.upsert(index + 1, Job::new("job-4")).unwrap();
    });

    let start = Instant::now();
    let resp = ts
        .list_blocking("jobs", "job-", index, Duration::from_secs(30))
        .unwrap();
    writer.join().unwrap();

    assert!(start.elapsed() < Duration::from_secs(10));
    assert_eq!(resp.index(), index + 1);
    assert_eq!(resp.matches["jobs"], vec!["job-1", "job-2", "job-3", "job-4"]);
}

#[test]
fn delete_wakes_the_waiter() {
    let ts = TestServer::new();
    let index = ts.seed_jobs(1, 3, 1);

    let writer = write_after(&ts.store, Duration::from_millis(50), move |store| {
        store.delete(EntityContext::Jobs, index + 1, "job-2").unwrap();
    });

    let resp = ts
        .list_blocking("jobs", "job-", index, Duration::from_secs(30))
        .unwrap();
    writer.join().unwrap();

    assert_eq!(resp.index(), index + 1);
    assert_eq!(resp.matches["jobs"], vec!["job-1", "job-3"]);
}

#[test]
fn fan_out_waiter_wakes_on_any_context() {
    let ts = TestServer::new();
    ts.store.upsert(4, Node::new("x-node")).unwrap();

    let writer = write_after(&ts.store, Duration::from_millis(50), |store| {
        store
            .upsert(5, Allocation::new("x-alloc", "job-1", "x-node"))
            .unwrap();
    });

    let resp = ts
        .list_blocking("", "x-", 4, Duration::from_secs(30))
        .unwrap();
    writer.join().unwrap();

    // allocs are now non-empty and take priority
    assert_eq!(resp.index(), 5);
    assert_eq!(resp.matches["allocs"], vec!["x-alloc"]);
    assert_eq!(resp.matches["nodes"], vec!["x-node"]);
}

#[test]
fn write_outside_prefix_keeps_waiting() {
    let ts = TestServer::new();
    let index = ts.seed_jobs(1, 3, 1);

    let writer = write_after(&ts.store, Duration::from_millis(30), move |store| {
        store.upsert(index + 1, Job::new("web-1")).unwrap();
    });

    let start = Instant::now();
    let resp = ts
        .list_blocking("jobs", "job-", index, Duration::from_millis(200))
        .unwrap();
    writer.join().unwrap();

    assert!(start.elapsed() >= Duration::from_millis(200));
    assert_eq!(resp.index(), index);
    assert_eq!(resp.matches["jobs"], vec!["job-1", "job-2", "job-3"]);
}

#[test]
fn successive_waits_observe_increasing_indexes() {
    let ts = TestServer::new();
    let mut index = ts.seed_jobs(1, 1, 1);

    let writer = {
        let store = Arc::clone(&ts.store);
        thread::spawn(move || {
            for i in 2..=6u64 {
                thread::sleep(Duration::from_millis(20));
                store.upsert(i, Job::new(format!("job-{}", i))).unwrap();
            }
        })
    };

    let mut seen = vec![index];
    while index < 6 {
        let resp = ts
            .list_blocking("jobs", "job-", index, Duration::from_secs(10))
            .unwrap();
        assert!(resp.index() > index, "{} not past {}", resp.index(), index);
        index = resp.index();
        seen.push(index);
    }
    writer.join().unwrap();

    assert!(seen.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(*seen.last().unwrap(), 6);
}

#[test]
fn emptied_priority_context_does_not_rewind_index() {
    let ts = TestServer::new();
    ts.store.upsert(12, Node::new("x-node")).unwrap();
    ts.store
        .upsert(13, Allocation::new("x-alloc", "job-1", "x-node"))
        .unwrap();
    assert_eq!(ts.list("", "x-").unwrap().index(), 13);

    let writer = write_after(&ts.store, Duration::from_millis(30), |store| {
        store.delete(EntityContext::Allocs, 20, "x-alloc").unwrap();
    });

    let start = Instant::now();
    let resp = ts
        .list_blocking("", "x-", 13, Duration::from_secs(30))
        .unwrap();
    writer.join().unwrap();

    assert!(start.elapsed() < Duration::from_secs(10));
    assert_eq!(resp.index(), 20);
    assert!(resp.matches["allocs"].is_empty());
    assert_eq!(resp.matches["nodes"], vec!["x-node"]);
}
