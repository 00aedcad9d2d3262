//! Core trait for content-addressed object storage.

use bytes::Bytes;
use strand_types::Address;

use crate::error::StoreError;

/// A content-addressed object store.
///
/// The address of an object is always `Address::from_data(bytes)`, so callers
/// can check what they get back. Implementations may be arbitrarily slow and
/// may lose objects; they are never trusted for authenticity.
///
/// All implementations must be `Send + Sync` and safe for concurrent reads.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store an object and return its content address.
    async fn put(&self, data: Bytes) -> Result<Address, StoreError>;

    /// Retrieve an object by address. Returns `None` if not found.
    async fn get(&self, address: Address) -> Result<Option<Bytes>, StoreError>;

    /// Delete an object. Deleting a missing object is not an error.
    async fn delete(&self, address: Address) -> Result<(), StoreError>;
}
