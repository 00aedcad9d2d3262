//! Chaos test: hostile and corrupt history.
//!
//! Replicas are handed heads that lead to entries written by outsiders,
//! entries with forged signatures, and objects corrupted in the store. Every
//! such sync must fail as a whole and leave the receiving replica untouched.

use bytes::Bytes;
use serde_json::json;
use strand_integration_tests::{ReplicaSet, init_tracing};
use strand_log::{Entry, LogError};
use strand_store::ObjectStore;

/// Entries by a key outside the allow list are refused.
#[tokio::test]
#[ntest::timeout(60000)]
async fn test_outsider_entries_rejected() {
    init_tracing();
    let mut set = ReplicaSet::new(2).await.unwrap();
    set.append(0, json!("honest")).await.unwrap();

    let mut outsider = set.outsider("mallory").await.unwrap();
    outsider.append(json!("spam")).await.unwrap();

    let before = set.hashes(0);
    let err = set
        .sync_heads(0, &outsider.head_hashes())
        .await
        .unwrap_err();
    assert!(matches!(err, LogError::NotAllowed(_)), "got: {err:?}");
    assert_eq!(set.hashes(0), before);

    // Honest replication is unaffected.
    set.append(1, json!("peer")).await.unwrap();
    set.sync(1, 0).await.unwrap();
    assert_eq!(set.log(0).len(), 2);
}

/// An outsider that builds on honest history is still refused as a whole.
#[tokio::test]
#[ntest::timeout(60000)]
async fn test_outsider_extension_of_honest_history_rejected() {
    let mut set = ReplicaSet::new(2).await.unwrap();
    for i in 0..3 {
        set.append(0, json!(i)).await.unwrap();
    }

    let mut outsider = set.outsider("mallory").await.unwrap();
    outsider.join(set.log(0)).await.unwrap();
    outsider.append(json!("spam")).await.unwrap();

    let err = set
        .sync_heads(1, &outsider.head_hashes())
        .await
        .unwrap_err();
    assert!(matches!(err, LogError::NotAllowed(_)));
    assert!(set.log(1).is_empty(), "no honest entry may slip in either");
}

/// A replica's entry re-signed with a garbled signature is refused.
#[tokio::test]
#[ntest::timeout(60000)]
async fn test_forged_signature_rejected() {
    let mut set = ReplicaSet::new(2).await.unwrap();
    let mut forged: Entry = set.append(0, json!("original")).await.unwrap();

    forged.payload = json!("rewritten");
    let address = set
        .store()
        .put(Bytes::from(forged.encode().unwrap()))
        .await
        .unwrap();

    let err = set.sync_heads(1, &[address]).await.unwrap_err();
    match err {
        LogError::InvalidSignature { hash, key, .. } => {
            assert_eq!(hash, address);
            assert_eq!(key, set.replica(0).identity.public_key());
        }
        other => panic!("expected InvalidSignature, got {other:?}"),
    }
    assert!(set.log(1).is_empty());
}

/// A corrupt ancestor in the store aborts the whole sync.
#[tokio::test]
#[ntest::timeout(60000)]
async fn test_corrupt_ancestor_aborts_sync() {
    let mut set = ReplicaSet::new(2).await.unwrap();
    let mut hashes = Vec::new();
    for i in 0..5 {
        hashes.push(set.append(0, json!(i)).await.unwrap().hash);
    }

    set.raw_store()
        .insert_unchecked(hashes[1], Bytes::from_static(b"bit rot"))
        .await;

    let err = set.sync(0, 1).await.unwrap_err();
    assert!(
        matches!(err, LogError::MalformedEntry { address, .. } if address == hashes[1]),
        "got: {err:?}"
    );
    assert!(set.log(1).is_empty());
}

/// A missing ancestor aborts the sync with the missing address.
#[tokio::test]
#[ntest::timeout(60000)]
async fn test_missing_ancestor_aborts_sync() {
    let mut set = ReplicaSet::new(2).await.unwrap();
    let mut hashes = Vec::new();
    for i in 0..4 {
        hashes.push(set.append(0, json!(i)).await.unwrap().hash);
    }
    set.raw_store().delete(hashes[0]).await.unwrap();

    let err = set.sync(0, 1).await.unwrap_err();
    assert!(matches!(err, LogError::Fetch { address, .. } if address == hashes[0]));
    assert!(set.log(1).is_empty());
}
