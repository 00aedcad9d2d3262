//! Local store of named ed25519 signing keys.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use ed25519_dalek::SigningKey;
use tracing::debug;

/// Named ed25519 signing keys held in memory.
#[derive(Default)]
pub struct Keystore {
    keys: RwLock<HashMap<String, SigningKey>>,
}

impl Keystore {
    /// Create an empty keystore.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a key named `id` exists.
    pub fn has_key(&self, id: &str) -> bool {
        self.keys
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    /// Return the key named `id`, if any.
    pub fn get_key(&self, id: &str) -> Option<SigningKey> {
        self.keys
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Generate a fresh random key for `id`, replacing any existing one.
    pub fn create_key(&self, id: &str) -> SigningKey {
        let seed: [u8; 32] = rand::random();
        self.import_key(id, seed)
    }

    /// Return the key for `id`, generating it on first use.
    pub fn get_or_create_key(&self, id: &str) -> SigningKey {
        match self.get_key(id) {
            Some(key) => key,
            None => self.create_key(id),
        }
    }

    /// Install a key derived from a known 32-byte seed.
    pub fn import_key(&self, id: &str, seed: [u8; 32]) -> SigningKey {
        let key = SigningKey::from_bytes(&seed);
        self.keys
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string(), key.clone());
        debug!(id, "installed signing key");
        key
    }
}
