//! Write-access control for log entries.

use std::collections::HashSet;

use strand_identity::Identity;

use crate::entry::Entry;

/// A refusal raised by an access controller.
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("access denied: {0}")]
    Denied(String),
}

/// Decides whether an entry's author may append to a log.
///
/// `identity` is the identity of the log doing the checking; the author is
/// named by the entry's `key`. The log treats `Ok(false)` and `Err(_)` the
/// same way: the entry is not authorized.
#[async_trait::async_trait]
pub trait AccessController: Send + Sync {
    async fn can_append(&self, entry: &Entry, identity: &Identity) -> Result<bool, AccessError>;
}

/// Admits every entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait::async_trait]
impl AccessController for AllowAll {
    async fn can_append(&self, _entry: &Entry, _identity: &Identity) -> Result<bool, AccessError> {
        Ok(true)
    }
}

/// Admits entries signed by one of a fixed set of public keys.
///
/// An empty list admits nobody, including the log's own writer.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    keys: HashSet<String>,
}

impl AllowList {
    /// Allow writes signed by any of `keys`.
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `key` may write.
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }
}

#[async_trait::async_trait]
impl AccessController for AllowList {
    async fn can_append(&self, entry: &Entry, _identity: &Identity) -> Result<bool, AccessError> {
        Ok(entry.key.as_deref().is_some_and(|key| self.keys.contains(key)))
    }
}

/// Adapts a plain function into an [`AccessController`].
pub struct AccessFn<F>(F);

impl<F> AccessFn<F>
where
    F: Fn(&Entry, &Identity) -> Result<bool, AccessError> + Send + Sync,
{
    pub fn new(check: F) -> Self {
        Self(check)
    }
}

#[async_trait::async_trait]
impl<F> AccessController for AccessFn<F>
where
    F: Fn(&Entry, &Identity) -> Result<bool, AccessError> + Send + Sync,
{
    async fn can_append(&self, entry: &Entry, identity: &Identity) -> Result<bool, AccessError> {
        (self.0)(entry, identity)
    }
}
