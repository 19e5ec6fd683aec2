//! Many blocking queries against one store

use crate::common::*;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn one_write_wakes_every_waiter() {
    let ts = TestServer::new();
    let index = ts.seed_jobs(1, 5, 1);
    let waiters = 16;
    let barrier = Arc::new(Barrier::new(waiters + 1));

    let handles: Vec<_> = (0..waiters)
        .map(|_| {
            let server = Arc::clone(&ts.server);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let req = ResourcesRequest::new("jobs", "job-")
                    .blocking(index, Duration::from_secs(30));
                server.resources().list(&req).unwrap()
            })
        })
        .collect();

    barrier.wait();
    thread::sleep(Duration::from_millis(50));
    ts.store.upsert(index + 1, Job::new("job-6")).unwrap();

    for handle in handles {
        let resp = handle.join().unwrap();
        assert_eq!(resp.index(), index + 1);
        assert_eq!(resp.matches["jobs"].len(), 6);
    }
    assert_eq!(ts.store.channel(EntityContext::Jobs).subscriber_count(), 0);
}

#[test]
fn waiters_on_different_prefixes_wake_independently() {
    let ts = TestServer::new();
    ts.store.upsert(1, Node::new("rack-a-1")).unwrap();
    ts.store.upsert(2, Node::new("rack-b-1")).unwrap();

    let server = Arc::clone(&ts.server);
    let rack_a = thread::spawn(move || {
        let req = ResourcesRequest::new("nodes", "rack-a").blocking(2, Duration::from_secs(30));
        server.resources().list(&req).unwrap()
    });
    let server = Arc::clone(&ts.server);
    let rack_b = thread::spawn(move || {
        let start = Instant::now();
        let req =
            ResourcesRequest::new("nodes", "rack-b").blocking(2, Duration::from_millis(300));
        (server.resources().list(&req).unwrap(), start.elapsed())
    });

    thread::sleep(Duration::from_millis(50));
    ts.store.upsert(3, Node::new("rack-a-2")).unwrap();

    let a = rack_a.join().unwrap();
    assert_eq!(a.index(), 3);
    assert_eq!(a.matches["nodes"], vec!["rack-a-1", "rack-a-2"]);

    let (b, elapsed) = rack_b.join().unwrap();
    assert!(elapsed >= Duration::from_millis(300));
    assert_eq!(b.matches["nodes"], vec!["rack-b-1"]);
}

#[test]
fn readers_and_writers_interleave() {
    let ts = TestServer::new();
    ts.seed_jobs(1, 1, 1);
    let writers = 4;
    let per_writer = 25u64;
    let next_index = Arc::new(AtomicU64::new(2));
    let barrier = Arc::new(Barrier::new(writers + 4));

    let mut handles = Vec::new();
    for w in 0..writers {
        let store = Arc::clone(&ts.store);
        let next_index = Arc::clone(&next_index);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            for i in 0..per_writer {
                let index = next_index.fetch_add(1, Ordering::SeqCst);
                store
                    .upsert(index, Job::new(format!("job-w{}-{:02}", w, i)))
                    .unwrap();
            }
        }));
    }

    for _ in 0..4 {
        let server = Arc::clone(&ts.server);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            let mut last = 0;
            for _ in 0..20 {
                let resp = server
                    .resources()
                    .list(&ResourcesRequest::new("jobs", "job-"))
                    .unwrap();
                assert!(resp.index() >= last);
                assert!(resp.matches["jobs"].len() <= beacon::TRUNCATE_LIMIT);
                last = resp.index();
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    let total = 1 + writers as u64 * per_writer;
    assert_eq!(ts.store.len(EntityContext::Jobs) as u64, total);
    let resp = ts.list("jobs", "job-").unwrap();
    assert!(resp.truncations["jobs"]);
}
