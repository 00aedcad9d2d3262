//! Error types for identity operations.

/// Errors that can occur while creating identities or signing.
///
/// A signature that simply does not verify is not an error: verification
/// answers `Ok(false)` for that.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The keystore holds no signing key for this identity.
    #[error("private signing key not found in keystore: {0}")]
    KeyNotFound(String),

    /// Key material could not be decoded.
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    /// The external signer refused or failed to sign.
    #[error("signing failed: {0}")]
    Signing(String),
}
