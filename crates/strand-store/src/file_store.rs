//! File-based object storage backend.
//!
//! Stores one file per object with a 2-level fan-out directory structure:
//! `{base_dir}/{hex[0..2]}/{hex[2..4]}/{hex}`.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use strand_types::Address;
use tracing::{debug, error};

use crate::error::StoreError;
use crate::traits::ObjectStore;

/// File-based object store with 2-level fan-out directory layout.
///
/// Each object is stored as a file at:
/// `{base_dir}/{hex(address)[0..2]}/{hex(address)[2..4]}/{hex(address)}`.
///
/// Writes are atomic: data is written to a temporary file first, then
/// renamed into place, so a crash never leaves a half-written object.
pub struct FileStore {
    base_dir: PathBuf,
}

impl FileStore {
    /// Create a new file store rooted at the given directory.
    ///
    /// The directory is created if it does not exist.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let base_dir = base_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    /// Compute the full file path for an address.
    fn object_path(&self, address: &Address) -> PathBuf {
        let hex = address.to_string();
        self.base_dir.join(&hex[0..2]).join(&hex[2..4]).join(&hex)
    }
}

#[async_trait::async_trait]
impl ObjectStore for FileStore {
    async fn put(&self, data: Bytes) -> Result<Address, StoreError> {
        let address = Address::from_data(&data);
        let path = self.object_path(&address);

        if tokio::fs::try_exists(&path).await? {
            return Ok(address);
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp_path = path.with_extension("tmp");
        tokio::fs::write(&tmp_path, &data).await?;
        tokio::fs::rename(&tmp_path, &path).await?;

        debug!(%address, path = %path.display(), size = data.len(), "stored object to file");
        Ok(address)
    }

    async fn get(&self, address: Address) -> Result<Option<Bytes>, StoreError> {
        let path = self.object_path(&address);
        match tokio::fs::read(&path).await {
            Ok(data) => {
                // Verify-on-read: a corrupt file is an error, never returned
                // as if it were the requested object.
                let actual = Address::from_data(&data);
                if actual != address {
                    error!(expected = %address, %actual, "object corruption detected on read");
                    return Err(StoreError::CorruptObject {
                        expected: address,
                        actual,
                    });
                }
                Ok(Some(Bytes::from(data)))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn delete(&self, address: Address) -> Result<(), StoreError> {
        let path = self.object_path(&address);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(%address, "deleted object file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}
