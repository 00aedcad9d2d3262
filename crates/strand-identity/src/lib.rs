//! Identities for strand log writers.
//!
//! An [`Identity`] is a cloneable handle naming a writer by its public key and
//! delegating signing and verification to a pluggable [`IdentityProvider`].
//! The log engine never sees key material or a concrete signature algorithm.
//!
//! [`Ed25519Provider`] is the bundled provider: ed25519 keys held in a local
//! [`Keystore`], with signatures and keys exchanged as hex strings.

mod ed25519;
mod error;
mod identity;
mod keystore;

pub use ed25519::Ed25519Provider;
pub use error::IdentityError;
pub use identity::{Identity, IdentityProvider, ProvisionedKey};
pub use keystore::Keystore;
