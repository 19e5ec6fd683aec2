//! Property tests for match collection
//!
//! For any set of IDs and any prefix, the lookup must agree with a plain
//! sorted filter of the same IDs.

use crate::common::*;
use proptest::collection::btree_set;
use proptest::prelude::*;

const LIMIT: usize = beacon::TRUNCATE_LIMIT;

fn seeded(ids: &std::collections::BTreeSet<String>) -> TestServer {
    let ts = TestServer::new();
    ts.store
        .upsert_all(1, ids.iter().map(|id| Job::new(id.clone())))
        .unwrap();
    ts
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn matches_equal_sorted_filter(
        ids in btree_set("[a-c]{1,4}", 0..60),
        prefix in "[a-c]{0,2}",
    ) {
        let ts = seeded(&ids);
        let resp = ts.list("jobs", &prefix).unwrap();

        let expected: Vec<String> = ids
            .iter()
            .filter(|id| id.starts_with(&prefix))
            .cloned()
            .collect();
        let got = &resp.matches["jobs"];

        prop_assert!(got.len() <= LIMIT);
        prop_assert_eq!(got.as_slice(), &expected[..expected.len().min(LIMIT)]);
        prop_assert_eq!(resp.truncations["jobs"], expected.len() > LIMIT);
    }

    #[test]
    fn every_match_has_the_prefix(
        ids in btree_set("[a-z0-9-]{1,12}", 0..40),
        prefix in "[a-z]{0,1}",
    ) {
        let ts = seeded(&ids);
        let resp = ts.list("", &prefix).unwrap();

        for matches in resp.matches.values() {
            prop_assert!(matches.iter().all(|id| id.starts_with(&prefix)));
            prop_assert!(matches.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn truncation_flag_is_exact(count in 0usize..45) {
        let ts = TestServer::new();
        if count > 0 {
            ts.store
                .upsert_all(1, (0..count).map(|i| Node::new(format!("node-{:03}", i))))
                .unwrap();
        }

        let resp = ts.list("nodes", "node-").unwrap();
        prop_assert_eq!(resp.matches["nodes"].len(), count.min(LIMIT));
        prop_assert_eq!(resp.truncations["nodes"], count > LIMIT);
    }
}
