//! The identity handle and the provider capability behind it.

use std::fmt;
use std::sync::Arc;

use crate::error::IdentityError;

type Result<T> = std::result::Result<T, IdentityError>;

/// Key material a provider hands out for a newly created identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedKey {
    /// Hex-encoded public key.
    pub public_key: String,
    /// Signature over the identity id, made with the key itself.
    pub pk_signature: String,
}

/// Signing and verification on behalf of identities.
///
/// Implementations are interchangeable: the log only needs `sign` and
/// `verify`, and treats signatures and public keys as opaque strings.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Load or create the signing key for `id` and prove possession of it by
    /// signing `id`.
    async fn provision(&self, id: &str) -> Result<ProvisionedKey>;

    /// Sign `data` with the key belonging to `identity`.
    async fn sign(&self, identity: &Identity, data: &[u8]) -> Result<String>;

    /// Check `signature` over `data` against `public_key`.
    ///
    /// Returns `Ok(false)` for any signature that does not verify, including
    /// ones that cannot be decoded.
    async fn verify(&self, signature: &str, public_key: &str, data: &[u8]) -> Result<bool>;
}

/// A log writer: an id, its public key, and the provider that signs for it.
///
/// Two identities are equal iff their public keys are equal.
#[derive(Clone)]
pub struct Identity {
    id: String,
    public_key: String,
    pk_signature: String,
    signature: String,
    provider: Arc<dyn IdentityProvider>,
}

impl Identity {
    /// Create an identity for `id`.
    ///
    /// The provider provisions a key and signs `id` with it; `signer` (an
    /// external authority, e.g. a user's root key) then signs
    /// `public_key ‖ pk_signature`, vouching for the key.
    pub async fn create<F>(
        provider: Arc<dyn IdentityProvider>,
        id: impl Into<String>,
        signer: F,
    ) -> Result<Self>
    where
        F: Fn(&[u8]) -> Result<String> + Send + Sync,
    {
        let id = id.into();
        let ProvisionedKey {
            public_key,
            pk_signature,
        } = provider.provision(&id).await?;
        let signature = signer(format!("{public_key}{pk_signature}").as_bytes())?;

        Ok(Self {
            id,
            public_key,
            pk_signature,
            signature,
            provider,
        })
    }

    /// Assemble an identity from parts produced elsewhere.
    pub fn from_parts(
        id: impl Into<String>,
        public_key: impl Into<String>,
        pk_signature: impl Into<String>,
        signature: impl Into<String>,
        provider: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            id: id.into(),
            public_key: public_key.into(),
            pk_signature: pk_signature.into(),
            signature: signature.into(),
            provider,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    pub fn pk_signature(&self) -> &str {
        &self.pk_signature
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn provider(&self) -> &Arc<dyn IdentityProvider> {
        &self.provider
    }

    /// Sign `data` as this identity.
    pub async fn sign(&self, data: &[u8]) -> Result<String> {
        self.provider.sign(self, data).await
    }

    /// Verify `signature` over `data` against `public_key` using this
    /// identity's provider.
    pub async fn verify(&self, signature: &str, public_key: &str, data: &[u8]) -> Result<bool> {
        self.provider.verify(signature, public_key, data).await
    }

    /// Check that `pk_signature` is a signature over `id` by `public_key`.
    pub async fn verify_key_binding(&self) -> Result<bool> {
        self.provider
            .verify(&self.pk_signature, &self.public_key, self.id.as_bytes())
            .await
    }

    /// Check the external authority's signature with a caller-supplied
    /// verifier that recovers the signing authority's id.
    pub fn verify_identity<V>(&self, verifier: V) -> bool
    where
        V: Fn(&[u8], &str) -> Option<String>,
    {
        let vouched = format!("{}{}", self.public_key, self.pk_signature);
        verifier(vouched.as_bytes(), &self.signature).as_deref() == Some(self.id.as_str())
    }
}

impl PartialEq for Identity {
    fn eq(&self, other: &Self) -> bool {
        self.public_key == other.public_key
    }
}

impl Eq for Identity {}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("id", &self.id)
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}
