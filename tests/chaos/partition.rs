//! Chaos test: network partition.
//!
//! Four replicas. Partition them 2 vs 2; each side keeps writing and
//! gossiping. Heal the partition and verify everyone converges on the union.

use serde_json::json;
use strand_integration_tests::{ReplicaSet, init_tracing};

/// Both sides of a partition keep writing; healing merges everything.
#[tokio::test]
#[ntest::timeout(60000)]
async fn test_partition_and_heal() {
    init_tracing();
    let mut set = ReplicaSet::new(4).await.unwrap();

    // --- Phase 1: healthy cluster ---
    for writer in 0..4 {
        set.append(writer, json!({ "phase": 1, "writer": writer }))
            .await
            .unwrap();
    }
    set.gossip_round().await.unwrap();
    assert!(set.converged(&[0, 1, 2, 3]));

    // --- Phase 2: partition {0, 1} | {2, 3} ---
    set.partition(&[0, 1]);
    assert_eq!(set.sync(0, 2).await.unwrap(), None);

    for i in 0..10 {
        let writer = i % 4;
        set.append(writer, json!({ "phase": 2, "seq": i })).await.unwrap();
    }
    set.gossip_round().await.unwrap();

    assert!(set.converged(&[0, 1]));
    assert!(set.converged(&[2, 3]));
    assert!(!set.converged(&[0, 2]), "sides must diverge while partitioned");
    // Writers 0 and 1 took six of the ten appends, writers 2 and 3 four.
    assert_eq!(set.log(0).len(), 4 + 6);
    assert_eq!(set.log(2).len(), 4 + 4);

    // --- Phase 3: heal ---
    set.heal();
    set.gossip_round().await.unwrap();

    assert!(set.converged(&[0, 1, 2, 3]));
    assert_eq!(set.log(3).len(), 14);
    for i in 0..4 {
        assert!(set.is_causally_ordered(i));
    }

    // After healing, a new append references both sides' histories.
    let heads_before = set.heads(1);
    let merged = set.append(1, json!("after-heal")).await.unwrap();
    assert!(heads_before.iter().all(|h| merged.next.contains(h)));
}

/// A replica isolated alone catches up on everything it missed.
#[tokio::test]
#[ntest::timeout(60000)]
async fn test_isolated_replica_catches_up() {
    let mut set = ReplicaSet::new(3).await.unwrap();

    set.partition(&[2]);
    for i in 0..30 {
        set.append(i % 2, json!(i)).await.unwrap();
        if i % 5 == 0 {
            set.gossip_round().await.unwrap();
        }
    }
    set.append(2, json!("alone")).await.unwrap();
    set.gossip_round().await.unwrap();
    assert_eq!(set.log(2).len(), 1);

    set.heal();
    set.gossip_round().await.unwrap();

    assert!(set.converged(&[0, 1, 2]));
    assert_eq!(set.log(2).len(), 31);
}
