//! The replicated log: local append, head tracking, and join.

use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strand_identity::Identity;
use strand_store::ObjectStore;
use strand_types::{Address, LamportClock};
use tracing::{debug, warn};

use crate::access::AccessController;
use crate::entry::{Entry, MAX_CLOCK_TIME};
use crate::entry_io::{EntryIo, FetchOptions};
use crate::error::LogError;

type Result<T> = std::result::Result<T, LogError>;

/// Result of [`Log::join`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The other log has a different id; nothing was merged.
    IdMismatch,
    /// Every new entry was admitted.
    Merged {
        /// Number of entries that were not already present.
        added: usize,
    },
}

/// What [`Log::to_address`] writes to the store.
#[derive(Serialize, Deserialize)]
struct LogManifest {
    id: String,
    heads: Vec<Address>,
}

/// An append-only, signed, mergeable log.
///
/// Entries are kept in an arena keyed by hash; `next` links are lookups into
/// it. The head set is maintained incrementally: an entry is a head iff no
/// known entry lists it as a parent.
pub struct Log {
    id: String,
    entries: HashMap<Address, Entry>,
    heads: HashSet<Address>,
    referenced: HashSet<Address>,
    clock: LamportClock,
    pointer_count: usize,
    identity: Identity,
    access: Arc<dyn AccessController>,
    store: Arc<dyn ObjectStore>,
}

/// Builder for [`Log`].
pub struct LogBuilder {
    store: Arc<dyn ObjectStore>,
    identity: Identity,
    access: Arc<dyn AccessController>,
    id: Option<String>,
    node_id: Option<String>,
    pointer_count: usize,
    entries: Vec<Entry>,
}

impl LogBuilder {
    /// Log id. Defaults to the current time in milliseconds.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Clock id for appended entries. Defaults to the identity's public key.
    pub fn node_id(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    /// Number of ancestor pointers [`Log::append`] records.
    pub fn pointer_count(mut self, pointer_count: usize) -> Self {
        self.pointer_count = pointer_count.max(1);
        self
    }

    /// Seed the log with entries that are trusted as-is.
    pub fn entries(mut self, entries: impl IntoIterator<Item = Entry>) -> Self {
        self.entries.extend(entries);
        self
    }

    /// Build the log, inserting any seeded entries.
    pub fn build(self) -> Log {
        let id = self.id.unwrap_or_else(default_log_id);
        let clock_id = self
            .node_id
            .unwrap_or_else(|| self.identity.public_key().to_string());

        let mut log = Log {
            id,
            entries: HashMap::new(),
            heads: HashSet::new(),
            referenced: HashSet::new(),
            clock: LamportClock::new(clock_id, 0),
            pointer_count: self.pointer_count,
            identity: self.identity,
            access: self.access,
            store: self.store,
        };
        log.insert_entries(self.entries);
        log
    }
}

fn default_log_id() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
        .to_string()
}

impl Log {
    /// Start building a log that persists to `store`, signs as `identity`
    /// and admits entries through `access`.
    pub fn builder(
        store: Arc<dyn ObjectStore>,
        identity: Identity,
        access: Arc<dyn AccessController>,
    ) -> LogBuilder {
        LogBuilder {
            store,
            identity,
            access,
            id: None,
            node_id: None,
            pointer_count: 1,
            entries: Vec::new(),
        }
    }

    /// The log id shared by every replica.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The clock the next append advances from.
    pub fn clock(&self) -> &LamportClock {
        &self.clock
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Number of entries held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by hash.
    pub fn get(&self, hash: &Address) -> Option<&Entry> {
        self.entries.get(hash)
    }

    pub fn has(&self, hash: &Address) -> bool {
        self.entries.contains_key(hash)
    }

    /// All entries, oldest first.
    pub fn values(&self) -> Vec<&Entry> {
        let mut values: Vec<&Entry> = self.entries.values().collect();
        values.sort();
        values
    }

    /// Head entries, newest first.
    pub fn heads(&self) -> Vec<&Entry> {
        let mut heads: Vec<&Entry> = self
            .heads
            .iter()
            .filter_map(|hash| self.entries.get(hash))
            .collect();
        heads.sort_by(|a, b| b.cmp(a));
        heads
    }

    /// Head hashes, newest first.
    pub fn head_hashes(&self) -> Vec<Address> {
        self.heads().into_iter().map(|entry| entry.hash).collect()
    }

    /// Walk from `roots` through `next`, newest first.
    ///
    /// Roots and parents absent from the log are skipped. Returns at most
    /// `amount` entries.
    pub fn traverse(&self, roots: &[Address], amount: Option<usize>) -> Vec<&Entry> {
        let limit = amount.unwrap_or(usize::MAX);
        let mut visited: HashSet<Address> = HashSet::new();
        let mut frontier: BinaryHeap<&Entry> = BinaryHeap::new();

        for root in roots {
            if let Some(entry) = self.entries.get(root)
                && visited.insert(*root)
            {
                frontier.push(entry);
            }
        }

        let mut result = Vec::new();
        while result.len() < limit {
            let Some(entry) = frontier.pop() else {
                break;
            };
            for parent in &entry.next {
                if let Some(parent_entry) = self.entries.get(parent)
                    && visited.insert(*parent)
                {
                    frontier.push(parent_entry);
                }
            }
            result.push(entry);
        }
        result
    }

    /// Append `payload` with the configured number of ancestor pointers.
    pub async fn append(&mut self, payload: Value) -> Result<Entry> {
        self.append_with_pointers(payload, self.pointer_count).await
    }

    /// Append `payload`, pointing at the current heads plus up to
    /// `max(pointer_count, heads)` entries of the newest-first history.
    ///
    /// The entry is authorized before anything is written; a rejected append
    /// leaves both the log and the store untouched.
    pub async fn append_with_pointers(
        &mut self,
        payload: Value,
        pointer_count: usize,
    ) -> Result<Entry> {
        let head_hashes = self.head_hashes();
        let max_head_time = self
            .heads()
            .iter()
            .map(|entry| entry.clock.time)
            .max()
            .unwrap_or(0);
        let clock = LamportClock::new(self.clock.id.clone(), self.clock.time.max(max_head_time))
            .checked_tick()
            .filter(|clock| clock.time < MAX_CLOCK_TIME)
            .ok_or_else(|| LogError::InvalidArgument("log clock is exhausted".into()))?;

        let wanted = pointer_count.max(head_hashes.len());
        let mut next = head_hashes.clone();
        next.extend(
            self.traverse(&head_hashes, Some(wanted))
                .into_iter()
                .map(|entry| entry.hash),
        );

        let entry = Entry::new_signed(&self.id, payload, next, clock, &self.identity).await?;

        if !self.authorized(&entry).await {
            warn!(hash = %entry.hash, log_id = %self.id, "append rejected by access controller");
            return Err(LogError::NotAllowed(entry.hash));
        }

        let address = Entry::to_address(self.store.as_ref(), &entry).await?;
        if address != entry.hash {
            return Err(LogError::MalformedEntry {
                address,
                reason: format!("store returned an address other than {}", entry.hash),
            });
        }

        self.insert_entries([entry.clone()]);
        debug!(
            hash = %entry.hash,
            log_id = %self.id,
            time = entry.clock.time,
            next = entry.next.len(),
            "appended entry"
        );
        Ok(entry)
    }

    /// Merge `other` into this log.
    ///
    /// Every entry not already present is verified and authorized before any
    /// is inserted; the first failure aborts the join and leaves this log
    /// unchanged.
    pub async fn join(&mut self, other: &Log) -> Result<JoinOutcome> {
        if other.id != self.id {
            debug!(log_id = %self.id, other = %other.id, "skipping join of a different log");
            return Ok(JoinOutcome::IdMismatch);
        }

        let mut candidates: Vec<&Entry> = other
            .entries
            .values()
            .filter(|entry| !self.entries.contains_key(&entry.hash))
            .collect();
        candidates.sort();

        for entry in &candidates {
            self.admit(entry).await?;
        }

        let added = candidates.len();
        self.insert_entries(candidates.into_iter().cloned());
        debug!(
            log_id = %self.id,
            added,
            len = self.entries.len(),
            heads = self.heads.len(),
            "joined log"
        );
        Ok(JoinOutcome::Merged { added })
    }

    /// Rebuild a log from head addresses by fetching their ancestors.
    ///
    /// Fetched entries pass the same checks as [`Log::join`].
    pub async fn from_entry_hash(
        store: Arc<dyn ObjectStore>,
        identity: Identity,
        access: Arc<dyn AccessController>,
        log_id: impl Into<String>,
        heads: &[Address],
        options: FetchOptions,
    ) -> Result<Self> {
        let fetched = EntryIo::fetch(store.clone(), heads, options, |_| {}).await?;

        let mut log = Log::builder(store, identity, access).id(log_id).build();
        for entry in &fetched.entries {
            log.admit(entry).await?;
        }
        log.insert_entries(fetched.entries);
        debug!(log_id = %log.id, len = log.len(), "loaded log from heads");
        Ok(log)
    }

    /// Persist the log's id and heads, returning the manifest's address.
    pub async fn to_address(&self) -> Result<Address> {
        let manifest = LogManifest {
            id: self.id.clone(),
            heads: self.head_hashes(),
        };
        let address = self
            .store
            .put(Bytes::from(serde_json::to_vec(&manifest)?))
            .await?;
        debug!(hash = %address, log_id = %self.id, "stored log manifest");
        Ok(address)
    }

    /// Load the manifest at `address` and rebuild the log it names.
    pub async fn from_address(
        store: Arc<dyn ObjectStore>,
        identity: Identity,
        access: Arc<dyn AccessController>,
        address: Address,
        options: FetchOptions,
    ) -> Result<Self> {
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
        let manifest: LogManifest = serde_json::from_slice(&bytes)?;
        Self::from_entry_hash(store, identity, access, manifest.id, &manifest.heads, options)
            .await
    }

    /// Verify and authorize an entry arriving from elsewhere.
    async fn admit(&self, entry: &Entry) -> Result<()> {
        if entry.id != self.id {
            warn!(
                hash = %entry.hash,
                log_id = %self.id,
                other = %entry.id,
                "entry from another log"
            );
            return Err(LogError::MalformedEntry {
                address: entry.hash,
                reason: format!("entry belongs to log {}", entry.id),
            });
        }

        let verified = match Entry::verify_signature(&self.identity, entry).await {
            Ok(verified) => verified,
            Err(LogError::Identity(e)) => {
                warn!(hash = %entry.hash, error = %e, "signature check failed");
                false
            }
            Err(e) => {
                warn!(hash = %entry.hash, error = %e, "rejecting entry");
                return Err(e);
            }
        };

        if !verified {
            let key = entry.key.clone().unwrap_or_default();
            let sig = entry.sig.clone().unwrap_or_default();
            warn!(hash = %entry.hash, %key, "invalid signature");
            return Err(LogError::InvalidSignature {
                hash: entry.hash,
                key,
                sig,
            });
        }

        if !entry.verify_hash() {
            warn!(hash = %entry.hash, "entry content does not match its hash");
            return Err(LogError::MalformedEntry {
                address: entry.hash,
                reason: "content does not match hash".into(),
            });
        }

        if !self.authorized(entry).await {
            warn!(hash = %entry.hash, key = ?entry.key, "entry rejected by access controller");
            return Err(LogError::NotAllowed(entry.hash));
        }
        Ok(())
    }

    async fn authorized(&self, entry: &Entry) -> bool {
        match self.access.can_append(entry, &self.identity).await {
            Ok(allowed) => allowed,
            Err(e) => {
                debug!(hash = %entry.hash, error = %e, "access controller refused");
                false
            }
        }
    }

    fn insert_entries(&mut self, entries: impl IntoIterator<Item = Entry>) {
        for entry in entries {
            if self.entries.contains_key(&entry.hash) {
                continue;
            }
            for parent in &entry.next {
                self.heads.remove(parent);
                self.referenced.insert(*parent);
            }
            if !self.referenced.contains(&entry.hash) {
                self.heads.insert(entry.hash);
            }
            if entry.clock.time > self.clock.time {
                self.clock = self.clock.merge(&entry.clock);
            }
            self.entries.insert(entry.hash, entry);
        }
    }
}

impl std::fmt::Debug for Log {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Log")
            .field("id", &self.id)
            .field("len", &self.entries.len())
            .field("heads", &self.heads.len())
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}
