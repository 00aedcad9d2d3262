//! Signed, content-addressed log entries.

use std::cmp::Ordering;
use std::collections::HashSet;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strand_identity::Identity;
use strand_store::ObjectStore;
use strand_types::{Address, LamportClock};
use tracing::debug;

use crate::error::LogError;

type Result<T> = std::result::Result<T, LogError>;

/// Format version written into every new entry.
pub const ENTRY_VERSION: u32 = 0;

/// Entries carry clock times strictly below this, so any log can append
/// after them.
pub const MAX_CLOCK_TIME: u64 = u64::MAX;

/// A single immutable record in a log.
///
/// `hash` is the blake3 address of the stored encoding, so two entries with
/// the same fields are the same entry. `key` and `sig` are absent only on
/// entries that were never signed or have been tampered with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    /// Address of the stored encoding.
    pub hash: Address,
    /// Id of the log this entry belongs to.
    pub id: String,
    /// Application data.
    pub payload: Value,
    /// Parent entries, deduplicated, in insertion order.
    pub next: Vec<Address>,
    /// Format version.
    pub v: u32,
    /// Lamport timestamp of the author.
    pub clock: LamportClock,
    /// Hex public key of the author.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Hex signature over the signable encoding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sig: Option<String>,
}

/// The fields covered by the signature (no `hash`, `key` or `sig`).
#[derive(Serialize)]
struct SignableContent<'a> {
    id: &'a str,
    payload: &'a Value,
    next: &'a [Address],
    v: u32,
    clock: &'a LamportClock,
}

/// The fields written to the object store. The address is computed over this.
#[derive(Serialize)]
struct StoredContent<'a> {
    id: &'a str,
    payload: &'a Value,
    next: &'a [Address],
    v: u32,
    clock: &'a LamportClock,
    #[serde(skip_serializing_if = "Option::is_none")]
    sig: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    key: Option<&'a str>,
}

/// Owned form of [`StoredContent`] for decoding.
#[derive(Deserialize)]
struct StoredEntry {
    id: String,
    payload: Value,
    next: Vec<Address>,
    v: u32,
    clock: LamportClock,
    #[serde(default)]
    sig: Option<String>,
    #[serde(default)]
    key: Option<String>,
}

impl Entry {
    /// Build and sign a new entry without touching any store.
    ///
    /// Parents may be given as entries or addresses; duplicates are dropped
    /// keeping the first occurrence.
    pub async fn new_signed<P>(
        log_id: &str,
        payload: Value,
        parents: impl IntoIterator<Item = P>,
        clock: LamportClock,
        identity: &Identity,
    ) -> Result<Self>
    where
        P: Into<Address>,
    {
        if log_id.is_empty() {
            return Err(LogError::InvalidArgument("entry requires a log id".into()));
        }
        if payload.is_null() {
            return Err(LogError::InvalidArgument("entry requires a payload".into()));
        }
        if clock.time >= MAX_CLOCK_TIME {
            return Err(LogError::InvalidArgument(format!(
                "clock time {} is out of range",
                clock.time
            )));
        }

        let mut seen = HashSet::new();
        let next: Vec<Address> = parents
            .into_iter()
            .map(Into::into)
            .filter(|address| seen.insert(*address))
            .collect();

        let signable = serde_json::to_vec(&SignableContent {
            id: log_id,
            payload: &payload,
            next: &next,
            v: ENTRY_VERSION,
            clock: &clock,
        })?;
        let sig = identity.sign(&signable).await?;

        let mut entry = Self {
            hash: Address::from([0u8; 32]),
            id: log_id.to_string(),
            payload,
            next,
            v: ENTRY_VERSION,
            clock,
            key: Some(identity.public_key().to_string()),
            sig: Some(sig),
        };
        entry.hash = entry.compute_hash()?;
        Ok(entry)
    }

    /// Create a signed entry and write it to `store`.
    ///
    /// The clock id is taken from `clock`, else `node_id`, else the log id;
    /// the time from `clock`, else 0.
    pub async fn create<P>(
        store: &dyn ObjectStore,
        log_id: &str,
        payload: Value,
        parents: impl IntoIterator<Item = P>,
        clock: Option<LamportClock>,
        node_id: Option<&str>,
        identity: &Identity,
    ) -> Result<Self>
    where
        P: Into<Address>,
    {
        let clock = match clock {
            Some(clock) => clock,
            None => LamportClock::new(node_id.unwrap_or(log_id), 0),
        };
        let entry = Self::new_signed(log_id, payload, parents, clock, identity).await?;

        let address = Self::to_address(store, &entry).await?;
        if address != entry.hash {
            return Err(LogError::MalformedEntry {
                address,
                reason: format!("store returned an address other than {}", entry.hash),
            });
        }
        Ok(entry)
    }

    /// The bytes the author signed.
    pub fn signable_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&SignableContent {
            id: &self.id,
            payload: &self.payload,
            next: &self.next,
            v: self.v,
            clock: &self.clock,
        })?)
    }

    /// The bytes written to the object store.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&StoredContent {
            id: &self.id,
            payload: &self.payload,
            next: &self.next,
            v: self.v,
            clock: &self.clock,
            sig: self.sig.as_deref(),
            key: self.key.as_deref(),
        })?)
    }

    /// Address of the current field values.
    pub fn compute_hash(&self) -> Result<Address> {
        Ok(Address::from_data(&self.encode()?))
    }

    /// Whether `hash` still matches the fields.
    pub fn verify_hash(&self) -> bool {
        self.compute_hash().is_ok_and(|hash| hash == self.hash)
    }

    /// Non-empty log id, a non-null payload, and a clock that can still be
    /// ticked.
    pub fn is_well_formed(&self) -> bool {
        self.defect().is_none()
    }

    fn defect(&self) -> Option<&'static str> {
        if self.id.is_empty() {
            Some("missing log id")
        } else if self.payload.is_null() {
            Some("missing payload")
        } else if self.clock.time >= MAX_CLOCK_TIME {
            Some("clock time out of range")
        } else {
            None
        }
    }

    /// Check the entry's signature against its own `key`.
    ///
    /// A signature that does not verify is `Ok(false)`. Missing key or
    /// signature, and ill-formed entries, are errors.
    pub async fn verify_signature(identity: &Identity, entry: &Entry) -> Result<bool> {
        if let Some(defect) = entry.defect() {
            return Err(LogError::MalformedEntry {
                address: entry.hash,
                reason: defect.into(),
            });
        }
        let key = entry
            .key
            .as_deref()
            .ok_or(LogError::MissingPublicKey(entry.hash))?;
        let sig = entry
            .sig
            .as_deref()
            .ok_or(LogError::MissingSignature(entry.hash))?;

        Ok(identity.verify(sig, key, &entry.signable_bytes()?).await?)
    }

    /// Write the stored encoding to `store`, returning its address.
    pub async fn to_address(store: &dyn ObjectStore, entry: &Entry) -> Result<Address> {
        let address = store.put(Bytes::from(entry.encode()?)).await?;
        debug!(hash = %address, log_id = %entry.id, "stored entry");
        Ok(address)
    }

    /// Load and decode the entry stored at `address`.
    pub async fn from_address(store: &dyn ObjectStore, address: Address) -> Result<Self> {
        let bytes = store
            .get(address)
            .await
            .map_err(|e| LogError::Fetch {
                address,
                source: Some(e),
            })?
            .ok_or(LogError::Fetch {
                address,
                source: None,
            })?;
        Self::decode(address, &bytes)
    }

    /// Decode stored bytes that were requested under `address`.
    ///
    /// Rejects bytes that do not hash to `address`, do not parse, or parse to
    /// an ill-formed entry.
    pub fn decode(address: Address, bytes: &[u8]) -> Result<Self> {
        let malformed = |reason: String| LogError::MalformedEntry { address, reason };

        let actual = Address::from_data(bytes);
        if actual != address {
            return Err(malformed(format!("content hashes to {actual}")));
        }

        let stored: StoredEntry =
            serde_json::from_slice(bytes).map_err(|e| malformed(e.to_string()))?;
        let entry = Self {
            hash: address,
            id: stored.id,
            payload: stored.payload,
            next: stored.next,
            v: stored.v,
            clock: stored.clock,
            key: stored.key,
            sig: stored.sig,
        };

        if let Some(defect) = entry.defect() {
            return Err(malformed(defect.into()));
        }
        Ok(entry)
    }

    /// Whether `value` has every entry field set.
    pub fn is_entry(value: &Value) -> bool {
        ["id", "next", "hash", "payload", "v", "clock"]
            .iter()
            .all(|field| value.get(field).is_some_and(|v| !v.is_null()))
    }

    /// Decode an entry from its JSON object form (which includes `hash`).
    pub fn from_json(value: Value) -> Result<Self> {
        if !Self::is_entry(&value) {
            return Err(LogError::InvalidArgument(
                "value is missing entry fields".into(),
            ));
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Clock time, then clock id, then hash.
    pub fn compare(a: &Entry, b: &Entry) -> Ordering {
        a.clock
            .cmp(&b.clock)
            .then_with(|| a.hash.cmp(&b.hash))
    }

    /// Entries are equal when their hashes are.
    pub fn is_equal(a: &Entry, b: &Entry) -> bool {
        a.hash == b.hash
    }

    /// Whether `parent` is listed in `child.next`.
    pub fn is_parent(parent: &Entry, child: &Entry) -> bool {
        child.next.contains(&parent.hash)
    }

    /// Follow the chain of descendants of `entry` within `pool`.
    ///
    /// Starting at `entry`, repeatedly picks the first entry in `pool` that
    /// lists the previous one as a parent. The chain is returned sorted by
    /// clock time, oldest first.
    pub fn find_children<'a>(entry: &Entry, pool: &'a [Entry]) -> Vec<&'a Entry> {
        let mut chain: Vec<&Entry> = Vec::new();
        let mut visited = HashSet::new();
        let mut prev = entry.hash;

        while let Some(child) = pool
            .iter()
            .find(|candidate| candidate.next.contains(&prev))
        {
            if !visited.insert(child.hash) {
                break;
            }
            chain.push(child);
            prev = child.hash;
        }

        chain.sort_by_key(|e| e.clock.time);
        chain
    }
}

impl From<&Entry> for Address {
    fn from(entry: &Entry) -> Self {
        entry.hash
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        Self::is_equal(self, other)
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        Self::compare(self, other)
    }
}
