//! Integration test: convergence under concurrent writers.
//!
//! Several replicas append concurrently between gossip rounds. After a
//! final round every replica must hold the same entries in the same order,
//! whatever order the syncs happened in.

use serde_json::json;
use strand_integration_tests::{ReplicaSet, init_tracing};

/// Four writers, ten rounds of append-then-gossip.
#[tokio::test]
async fn test_concurrent_writers_converge() {
    init_tracing();
    let mut set = ReplicaSet::new(4).await.unwrap();

    for round in 0..10 {
        for writer in 0..set.len() {
            set.append(writer, json!({ "writer": writer, "round": round }))
                .await
                .unwrap();
        }
        set.gossip_round().await.unwrap();
    }

    let all: Vec<usize> = (0..set.len()).collect();
    assert!(set.converged(&all));
    assert_eq!(set.log(0).len(), 40);
    for i in &all {
        assert!(set.is_causally_ordered(*i), "replica {i} out of causal order");
    }
}

/// Writers that never hear from each other until the end still agree.
#[tokio::test]
async fn test_divergent_histories_merge_deterministically() {
    let mut set = ReplicaSet::new(3).await.unwrap();
    for i in 0..15 {
        set.append(i % 3, json!(i)).await.unwrap();
    }

    // Different sync orders on each replica.
    set.sync(1, 0).await.unwrap();
    set.sync(2, 0).await.unwrap();
    set.sync(2, 1).await.unwrap();
    set.sync(0, 1).await.unwrap();
    set.sync(0, 2).await.unwrap();

    assert!(set.converged(&[0, 1, 2]));
    assert_eq!(set.log(2).len(), 15);
    assert_eq!(set.heads(0), set.heads(2));
}

/// The replica clock never falls behind anything it has seen.
#[tokio::test]
async fn test_clocks_advance_past_observed_entries() {
    let mut set = ReplicaSet::new(2).await.unwrap();
    for i in 0..20 {
        set.append(0, json!(i)).await.unwrap();
    }
    set.append(1, json!("behind")).await.unwrap();

    set.sync(0, 1).await.unwrap();
    assert_eq!(set.log(1).clock().time, 20);

    let next = set.append(1, json!("ahead")).await.unwrap();
    assert_eq!(next.clock.time, 21);
    assert_eq!(next.clock.id, "replica-1");
}

/// Slow, out-of-order reads with a tight worker bound still converge.
#[tokio::test]
async fn test_slow_store_bounded_fetch() {
    let mut set = ReplicaSet::with_latency(3, (1, 10), 2).await.unwrap();
    for i in 0..24 {
        set.append(i % 3, json!(i)).await.unwrap();
    }

    set.gossip_round().await.unwrap();
    set.gossip_round().await.unwrap();

    assert!(set.converged(&[0, 1, 2]));
    assert!(set.store().peak_concurrent_reads() <= 2);
}
