//! Cancelling waits by request ID

use crate::common::*;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn wait_until_registered(server: &Server, id: &str) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while server.registry().get(id).is_none() {
        assert!(Instant::now() < deadline, "query {} never registered", id);
        thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn cancel_ends_a_suspended_wait() {
    let ts = TestServer::new();
    let index = ts.seed_jobs(1, 3, 1);

    let server = Arc::clone(&ts.server);
    let canceller = thread::spawn(move || {
        wait_until_registered(&server, "lookup-1");
        assert!(server.cancel_query("lookup-1"));
    });

    let req = ResourcesRequest::new("jobs", "job-")
        .blocking(index, Duration::from_secs(60))
        .with_request_id("lookup-1");
    let start = Instant::now();
    let err = ts.server.resources().list(&req).unwrap_err();
    canceller.join().unwrap();

    assert_eq!(err, Error::Cancelled);
    assert!(start.elapsed() < Duration::from_secs(10));
    assert!(ts.server.registry().is_empty());
    assert_eq!(ts.store.channel(EntityContext::Jobs).subscriber_count(), 0);
}

#[test]
fn cancel_only_affects_the_named_query() {
    let ts = TestServer::new();
    let index = ts.seed_jobs(1, 3, 1);

    let server = Arc::clone(&ts.server);
    let survivor = thread::spawn(move || {
        let req = ResourcesRequest::new("jobs", "job-")
            .blocking(index, Duration::from_secs(60))
            .with_request_id("keep");
        server.resources().list(&req)
    });

    let server = Arc::clone(&ts.server);
    let victim = thread::spawn(move || {
        let req = ResourcesRequest::new("jobs", "job-")
            .blocking(index, Duration::from_secs(60))
            .with_request_id("drop");
        server.resources().list(&req)
    });

    wait_until_registered(&ts.server, "keep");
    wait_until_registered(&ts.server, "drop");
    assert!(ts.server.cancel_query("drop"));
    assert_eq!(victim.join().unwrap().unwrap_err(), Error::Cancelled);

    ts.store.upsert(index + 1, Job::new("job-4")).unwrap();
    let resp = survivor.join().unwrap().unwrap();
    assert_eq!(resp.index(), index + 1);
    assert!(ts.server.registry().is_empty());
}

#[test]
fn cancel_unknown_id_is_a_no_op() {
    let ts = TestServer::new();
    assert!(!ts.server.cancel_query("nobody"));
}

#[test]
fn completed_query_is_unregistered() {
    let ts = TestServer::new();
    ts.seed_jobs(1, 3, 1);

    let req = ResourcesRequest::new("jobs", "").with_request_id("once");
    ts.server.resources().list(&req).unwrap();

    assert!(ts.server.registry().is_empty());
    assert!(!ts.server.cancel_query("once"));
}

#[test]
fn generated_request_id_can_cancel() {
    let ts = TestServer::new();
    let index = ts.seed_jobs(1, 3, 1);

    let req = ResourcesRequest::new("jobs", "job-")
        .blocking(index, Duration::from_secs(60))
        .cancellable();
    let id = req.request_id().unwrap().to_string();

    let server = Arc::clone(&ts.server);
    let canceller = thread::spawn(move || {
        wait_until_registered(&server, &id);
        assert!(server.cancel_query(&id));
    });

    let err = ts.server.resources().list(&req).unwrap_err();
    canceller.join().unwrap();

    assert_eq!(err, Error::Cancelled);
    assert!(ts.server.registry().is_empty());
}
