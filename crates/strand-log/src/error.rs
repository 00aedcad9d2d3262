//! Error types for the log crate.

use std::time::Duration;

use strand_identity::IdentityError;
use strand_store::StoreError;
use strand_types::{Address, InvalidAddress};

/// Errors that can occur during entry, traversal, and log operations.
///
/// A join between logs with different ids is not an error; see
/// [`JoinOutcome::IdMismatch`](crate::JoinOutcome::IdMismatch).
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// Missing or malformed input to a constructor.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A textual address that is empty or not hex.
    #[error("invalid hash: {0}")]
    InvalidHash(#[from] InvalidAddress),

    /// Structurally invalid entry met during verification or traversal.
    #[error("malformed entry {address}: {reason}")]
    MalformedEntry {
        /// Address the entry was stored or claimed under.
        address: Address,
        /// What is wrong with it.
        reason: String,
    },

    /// A signed entry without a public key.
    #[error("entry {0} doesn't have a public key")]
    MissingPublicKey(Address),

    /// A signed entry without a signature.
    #[error("entry {0} doesn't have a signature")]
    MissingSignature(Address),

    /// Signature present but does not verify.
    #[error("could not validate signature '{sig}' for key '{key}' on entry {hash}")]
    InvalidSignature {
        /// The offending entry.
        hash: Address,
        /// Public key the entry claims.
        key: String,
        /// Signature the entry carries.
        sig: String,
    },

    /// The access controller rejected the entry.
    #[error("not allowed to write: entry {0}")]
    NotAllowed(Address),

    /// The store could not produce an address's contents.
    #[error("failed to fetch {address} from the store")]
    Fetch {
        /// The address that could not be resolved.
        address: Address,
        /// Store failure, or `None` if the object is simply missing.
        #[source]
        source: Option<StoreError>,
    },

    /// A fetch worker task failed.
    #[error("fetch worker failed: {0}")]
    Worker(String),

    /// Traversal stopped by its cancellation token.
    #[error("traversal cancelled")]
    Cancelled,

    /// Traversal exceeded its timeout.
    #[error("traversal timed out after {0:?}")]
    Timeout(Duration),

    /// Storage backend error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Identity provider error.
    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration could not be read or parsed.
    #[error("config error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for LogError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for LogError {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}
