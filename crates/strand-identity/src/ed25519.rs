//! ed25519 identity provider backed by a [`Keystore`].

use std::sync::Arc;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

use crate::error::IdentityError;
use crate::identity::{Identity, IdentityProvider, ProvisionedKey};
use crate::keystore::Keystore;

type Result<T> = std::result::Result<T, IdentityError>;

/// Signs with ed25519 keys from a local keystore.
///
/// Public keys are 32 bytes and signatures 64 bytes, both hex-encoded.
pub struct Ed25519Provider {
    keystore: Arc<Keystore>,
}

impl Ed25519Provider {
    pub fn new(keystore: Arc<Keystore>) -> Self {
        Self { keystore }
    }

    pub fn keystore(&self) -> &Arc<Keystore> {
        &self.keystore
    }

    /// Hex-encoded public key of a signing key.
    pub fn public_key_hex(key: &SigningKey) -> String {
        hex::encode(key.verifying_key().to_bytes())
    }

    /// Sign `data` with `key`, returning the hex signature.
    pub fn sign_with(key: &SigningKey, data: &[u8]) -> String {
        hex::encode(key.sign(data).to_bytes())
    }

    fn decode_public_key(public_key: &str) -> Option<VerifyingKey> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(public_key, &mut bytes).ok()?;
        VerifyingKey::from_bytes(&bytes).ok()
    }

    fn decode_signature(signature: &str) -> Option<Signature> {
        let mut bytes = [0u8; 64];
        hex::decode_to_slice(signature, &mut bytes).ok()?;
        Some(Signature::from_bytes(&bytes))
    }
}

#[async_trait::async_trait]
impl IdentityProvider for Ed25519Provider {
    async fn provision(&self, id: &str) -> Result<ProvisionedKey> {
        let key = self.keystore.get_or_create_key(id);
        Ok(ProvisionedKey {
            public_key: Self::public_key_hex(&key),
            pk_signature: Self::sign_with(&key, id.as_bytes()),
        })
    }

    async fn sign(&self, identity: &Identity, data: &[u8]) -> Result<String> {
        let key = self
            .keystore
            .get_key(identity.id())
            .ok_or_else(|| IdentityError::KeyNotFound(identity.id().to_string()))?;

        if Self::public_key_hex(&key) != identity.public_key() {
            return Err(IdentityError::InvalidKey(format!(
                "keystore key for {} does not match the identity's public key",
                identity.id()
            )));
        }

        Ok(Self::sign_with(&key, data))
    }

    async fn verify(&self, signature: &str, public_key: &str, data: &[u8]) -> Result<bool> {
        let Some(verifying_key) = Self::decode_public_key(public_key) else {
            return Ok(false);
        };
        let Some(signature) = Self::decode_signature(signature) else {
            return Ok(false);
        };
        Ok(verifying_key.verify(data, &signature).is_ok())
    }
}
