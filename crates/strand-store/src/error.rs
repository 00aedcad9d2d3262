//! Error types for object storage operations.

use strand_types::Address;

/// Errors that can occur during object storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An I/O error occurred.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored bytes do not hash to the address they were stored under.
    #[error("object corruption detected: expected {expected}, actual hash {actual}")]
    CorruptObject {
        /// The address that was requested.
        expected: Address,
        /// The address computed from the bytes actually stored.
        actual: Address,
    },

    /// The backend could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
