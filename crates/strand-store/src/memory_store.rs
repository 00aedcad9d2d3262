//! In-memory object storage backend.

use std::collections::HashMap;

use bytes::Bytes;
use strand_types::Address;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StoreError;
use crate::traits::ObjectStore;

/// In-memory object store backed by a `RwLock<HashMap>`.
///
/// Useful for tests and for replicas that keep their history in memory only.
#[derive(Default)]
pub struct MemoryStore {
    objects: RwLock<HashMap<Address, Bytes>>,
}

impl MemoryStore {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    /// Whether the store holds no objects.
    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    /// Store `data` under `address` without hashing it.
    ///
    /// Lets tests stand in for an untrusted store that serves bytes which do
    /// not match their address.
    pub async fn insert_unchecked(&self, address: Address, data: Bytes) {
        self.objects.write().await.insert(address, data);
    }
}

#[async_trait::async_trait]
impl ObjectStore for MemoryStore {
    async fn put(&self, data: Bytes) -> Result<Address, StoreError> {
        let address = Address::from_data(&data);
        debug!(%address, size = data.len(), "storing object in memory");
        self.objects.write().await.insert(address, data);
        Ok(address)
    }

    async fn get(&self, address: Address) -> Result<Option<Bytes>, StoreError> {
        Ok(self.objects.read().await.get(&address).cloned())
    }

    async fn delete(&self, address: Address) -> Result<(), StoreError> {
        self.objects.write().await.remove(&address);
        debug!(%address, "deleted object from memory");
        Ok(())
    }
}
