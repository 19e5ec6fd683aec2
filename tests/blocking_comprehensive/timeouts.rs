//! Waits that end without a relevant write

use crate::common::*;
use std::time::{Duration, Instant};

#[test]
fn current_index_without_writes_waits_full_timeout() {
    let ts = TestServer::new();
    let index = ts.seed_jobs(1, 5, 1);
    let baseline = ts.list("jobs", "job-").unwrap();

    let start = Instant::now();
    let resp = ts
        .list_blocking("jobs", "job-", index, Duration::from_millis(200))
        .unwrap();
    let elapsed = start.elapsed();

    assert!(elapsed >= Duration::from_millis(200), "returned after {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(2), "returned after {:?}", elapsed);
    assert_eq!(resp.index(), index);
    assert_eq!(resp.matches, baseline.matches);
    assert_eq!(resp.truncations, baseline.truncations);
}

#[test]
fn stale_min_index_returns_immediately() {
    let ts = TestServer::new();
    let index = ts.seed_jobs(1, 5, 1);

    let start = Instant::now();
    let resp = ts
        .list_blocking("jobs", "job-", index - 1, Duration::from_secs(30))
        .unwrap();
    assert_eq!(resp.index(), index);
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[test]
fn min_index_ahead_of_store_times_out() {
    let ts = TestServer::new();
    let index = ts.seed_jobs(1, 2, 1);

    let start = Instant::now();
    let resp = ts
        .list_blocking("jobs", "", index + 1_000, Duration::from_millis(100))
        .unwrap();
    assert!(start.elapsed() >= Duration::from_millis(100));
    assert_eq!(resp.index(), index);
}

#[test]
fn wait_is_clamped_to_configured_maximum() {
    let ts = TestServer::with_config(QueryConfig {
        max_query_time_ms: 150,
        default_query_time_ms: 100,
        jitter_fraction: 0,
    });
    let index = ts.seed_jobs(1, 1, 1);

    let start = Instant::now();
    ts.list_blocking("jobs", "", index, Duration::from_secs(3600))
        .unwrap();
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(150));
    assert!(elapsed < Duration::from_secs(3));
}

#[test]
fn zero_wait_uses_configured_default() {
    let ts = TestServer::with_config(QueryConfig {
        max_query_time_ms: 10_000,
        default_query_time_ms: 120,
        jitter_fraction: 0,
    });
    let index = ts.seed_jobs(1, 1, 1);

    let start = Instant::now();
    ts.list_blocking("jobs", "", index, Duration::ZERO).unwrap();
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(120));
    assert!(elapsed < Duration::from_secs(5));
}

#[test]
fn stagger_extends_wait_by_at_most_a_sixteenth() {
    let ts = TestServer::with_config(QueryConfig::default());
    let index = ts.seed_jobs(1, 1, 1);

    let start = Instant::now();
    ts.list_blocking("jobs", "", index, Duration::from_millis(160))
        .unwrap();
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(160));
    assert!(elapsed < Duration::from_secs(2));
}

#[test]
fn unrelated_context_write_does_not_end_wait() {
    let ts = TestServer::new();
    let index = ts.seed_jobs(1, 3, 1);

    let store = std::sync::Arc::clone(&ts.store);
    let writer = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(30));
        store.upsert(index + 1, Node::new("node-1")).unwrap();
    });

    let start = Instant::now();
    let resp = ts
        .list_blocking("jobs", "job-", index, Duration::from_millis(200))
        .unwrap();
    writer.join().unwrap();

    assert!(start.elapsed() >= Duration::from_millis(200));
    assert_eq!(resp.index(), index);
}
