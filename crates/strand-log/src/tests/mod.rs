//! Tests for the log crate.


use std::sync::Arc;

use strand_identity::{Ed25519Provider, Identity, Keystore};
use strand_store::{MemoryStore, ObjectStore};

use crate::access::{AccessController, AllowAll};
use crate::log::Log;

/// A provider with an empty keystore, shared by every identity in a test.
fn test_provider() -> Arc<Ed25519Provider> {
    Arc::new(Ed25519Provider::new(Arc::new(Keystore::new())))
}

/// Create an identity named `name` whose key is derived from `seed`.
///
/// The external signer just hex-encodes what it is given; no test here
/// checks the authority's signature.
async fn test_identity(provider: &Arc<Ed25519Provider>, name: &str, seed: u8) -> Identity {
    provider.keystore().import_key(name, [seed; 32]);
    Identity::create(provider.clone(), name, |data| Ok(hex::encode(data)))
        .await
        .unwrap()
}

fn test_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

/// A log named `log_id` that admits everyone, with `node_id` as clock id.
fn test_log(store: Arc<dyn ObjectStore>, identity: Identity, log_id: &str, node_id: &str) -> Log {
    guarded_log(store, identity, log_id, node_id, Arc::new(AllowAll))
}

fn guarded_log(
    store: Arc<dyn ObjectStore>,
    identity: Identity,
    log_id: &str,
    node_id: &str,
    access: Arc<dyn AccessController>,
) -> Log {
    Log::builder(store, identity, access)
        .id(log_id)
        .node_id(node_id)
        .build()
}

/// Replace the first hex digit of `s` with a different one.
fn flip_hex(s: &str) -> String {
    let mut chars: Vec<char> = s.chars().collect();
    chars[0] = if chars[0] == '0' { '1' } else { '0' };
    chars.into_iter().collect()
}

/// Payloads of `log` in log order.
fn payloads(log: &Log) -> Vec<String> {
    log.values()
        .iter()
        .map(|entry| entry.payload.as_str().unwrap_or_default().to_string())
        .collect()
}
