//! Integration test: replication between replicas.
//!
//! Replicas announce head hashes only; every other replica rebuilds the
//! history from the shared store, verifies it, and joins it.

use serde_json::json;
use strand_integration_tests::{LOG_ID, ReplicaSet, init_tracing};
use strand_log::{FetchOptions, JoinOutcome, Log};

/// Two replicas write one entry each and exchange heads.
#[tokio::test]
async fn test_two_replicas_converge() {
    init_tracing();
    let mut set = ReplicaSet::new(2).await.unwrap();

    set.append(0, json!("one")).await.unwrap();
    set.append(1, json!("two")).await.unwrap();

    assert_eq!(
        set.sync(1, 0).await.unwrap(),
        Some(JoinOutcome::Merged { added: 1 })
    );
    assert_eq!(
        set.sync(0, 1).await.unwrap(),
        Some(JoinOutcome::Merged { added: 1 })
    );

    assert!(set.converged(&[0, 1]));
    let payloads: Vec<_> = set.log(0).values().iter().map(|e| e.payload.clone()).collect();
    assert_eq!(payloads, vec![json!("one"), json!("two")]);
}

/// A replica with no history catches up on a long log from its heads alone.
#[tokio::test]
async fn test_late_joiner_rebuilds_history() {
    let mut set = ReplicaSet::new(3).await.unwrap();
    for i in 0..50 {
        set.append(0, json!({ "seq": i })).await.unwrap();
    }

    set.sync(0, 2).await.unwrap();

    assert_eq!(set.log(2).len(), 50);
    assert!(set.converged(&[0, 2]));
    assert!(set.is_causally_ordered(2));
    assert!(set.log(1).is_empty(), "replica 1 never synced");
}

/// Syncing the same heads again fetches nothing new.
#[tokio::test]
async fn test_repeated_sync_is_noop() {
    let mut set = ReplicaSet::new(2).await.unwrap();
    for i in 0..10 {
        set.append(0, json!(i)).await.unwrap();
    }

    set.sync(0, 1).await.unwrap();
    let before = set.hashes(1);

    assert_eq!(
        set.sync(0, 1).await.unwrap(),
        Some(JoinOutcome::Merged { added: 0 })
    );
    assert_eq!(set.hashes(1), before);
}

/// Only entries the receiver lacks are fetched after an incremental append.
#[tokio::test]
async fn test_incremental_sync_adds_only_new_entries() {
    let mut set = ReplicaSet::new(2).await.unwrap();
    for i in 0..5 {
        set.append(0, json!(i)).await.unwrap();
    }
    set.sync(0, 1).await.unwrap();

    set.append(0, json!("late")).await.unwrap();
    assert_eq!(
        set.sync(0, 1).await.unwrap(),
        Some(JoinOutcome::Merged { added: 1 })
    );
    assert!(set.converged(&[0, 1]));
}

/// A receiver that appends after syncing points at the sender's head.
#[tokio::test]
async fn test_append_after_sync_references_remote_head() {
    let mut set = ReplicaSet::new(2).await.unwrap();
    let remote = set.append(0, json!("remote")).await.unwrap();
    set.sync(0, 1).await.unwrap();

    let local = set.append(1, json!("local")).await.unwrap();
    assert_eq!(local.next, vec![remote.hash]);
    assert_eq!(local.clock.time, remote.clock.time + 1);
}

/// A log manifest stored by one replica can be opened by another.
#[tokio::test]
async fn test_manifest_handoff() {
    let mut set = ReplicaSet::new(2).await.unwrap();
    for i in 0..8 {
        set.append(0, json!(i)).await.unwrap();
    }

    let manifest = set.log(0).to_address().await.unwrap();
    let replica = set.replica(1);
    let opened = Log::from_address(
        set.store().clone(),
        replica.identity.clone(),
        replica.access.clone(),
        manifest,
        FetchOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(opened.id(), LOG_ID);
    assert_eq!(opened.len(), 8);
    assert_eq!(opened.head_hashes(), set.heads(0));
}
