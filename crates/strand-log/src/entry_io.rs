//! Ancestor traversal: rebuild a log's entries from head addresses.
//!
//! [`EntryIo::fetch`] walks the parent DAG breadth-first against an
//! [`ObjectStore`], keeping a bounded number of reads in flight. Reads may
//! complete in any order; each resolved entry enqueues its unseen parents.

use std::collections::{HashMap, HashSet, VecDeque};
use std::future;
use std::sync::Arc;
use std::time::Duration;

use strand_store::ObjectStore;
use strand_types::Address;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::entry::Entry;
use crate::error::LogError;

/// Default number of concurrent store reads.
pub const DEFAULT_CONCURRENCY: usize = 32;

/// Bounds and controls for a traversal.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Maximum number of entries to resolve. `None` walks to the roots.
    pub amount: Option<usize>,
    /// Maximum number of outstanding store reads.
    pub concurrency: usize,
    /// Addresses never fetched or traversed through.
    pub exclude: HashSet<Address>,
    /// Give up after this long.
    pub timeout: Option<Duration>,
    /// Stop when this token is cancelled.
    pub cancel: Option<CancellationToken>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            amount: None,
            concurrency: DEFAULT_CONCURRENCY,
            exclude: HashSet::new(),
            timeout: None,
            cancel: None,
        }
    }
}

/// Reported once per resolved entry, in completion order.
pub struct FetchProgress<'a> {
    pub address: Address,
    pub entry: &'a Entry,
    /// Number of entries resolved so far, including this one.
    pub resolved: usize,
    pub resolved_entries: &'a HashMap<Address, Entry>,
    /// Addresses waiting to be fetched.
    pub queue: &'a VecDeque<Address>,
}

/// The outcome of a traversal.
#[derive(Debug, Default)]
pub struct FetchResult {
    /// Resolved entries in the order their reads completed.
    pub entries: Vec<Entry>,
    /// Resolved addresses no resolved entry points at.
    pub heads: Vec<Address>,
}

/// Parallel ancestor fetcher.
pub struct EntryIo;

impl EntryIo {
    /// Fetch `heads` and their ancestors from `store`.
    ///
    /// Any missing or malformed object aborts the whole traversal; reads
    /// still in flight are aborted with it.
    pub async fn fetch<F>(
        store: Arc<dyn ObjectStore>,
        heads: &[Address],
        options: FetchOptions,
        mut on_progress: F,
    ) -> Result<FetchResult, LogError>
    where
        F: FnMut(FetchProgress<'_>),
    {
        let FetchOptions {
            amount,
            concurrency,
            exclude,
            timeout,
            cancel,
        } = options;
        let limit = amount.unwrap_or(usize::MAX);
        let concurrency = concurrency.max(1);
        let deadline = timeout.map(|t| Instant::now() + t);
        let cancel = cancel.unwrap_or_default();

        // Queued, in flight, or resolved.
        let mut seen: HashSet<Address> = HashSet::new();
        let mut queue: VecDeque<Address> = VecDeque::new();
        for head in heads {
            if !exclude.contains(head) && seen.insert(*head) {
                queue.push_back(*head);
            }
        }

        let mut resolved: HashMap<Address, Entry> = HashMap::new();
        let mut order: Vec<Address> = Vec::new();
        let mut in_flight = JoinSet::new();

        loop {
            while in_flight.len() < concurrency && resolved.len() + in_flight.len() < limit {
                let Some(address) = queue.pop_front() else {
                    break;
                };
                let store = store.clone();
                in_flight.spawn(async move { (address, store.get(address).await) });
            }

            if in_flight.is_empty() {
                break;
            }

            let joined = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(resolved = resolved.len(), "traversal cancelled");
                    return Err(LogError::Cancelled);
                }
                _ = expired(deadline) => {
                    let elapsed = timeout.unwrap_or_default();
                    warn!(resolved = resolved.len(), ?elapsed, "traversal timed out");
                    return Err(LogError::Timeout(elapsed));
                }
                joined = in_flight.join_next() => joined,
            };
            let Some(joined) = joined else {
                break;
            };

            let (address, fetched) = joined.map_err(|e| LogError::Worker(e.to_string()))?;
            let bytes = match fetched {
                Ok(Some(bytes)) => bytes,
                Ok(None) => {
                    warn!(hash = %address, "entry missing from store");
                    return Err(LogError::Fetch {
                        address,
                        source: None,
                    });
                }
                Err(e) => {
                    warn!(hash = %address, error = %e, "store read failed");
                    return Err(LogError::Fetch {
                        address,
                        source: Some(e),
                    });
                }
            };
            let entry = Entry::decode(address, &bytes)?;

            for parent in &entry.next {
                if !exclude.contains(parent) && seen.insert(*parent) {
                    queue.push_back(*parent);
                }
            }
            resolved.insert(address, entry);
            order.push(address);

            if let Some(entry) = resolved.get(&address) {
                on_progress(FetchProgress {
                    address,
                    entry,
                    resolved: resolved.len(),
                    resolved_entries: &resolved,
                    queue: &queue,
                });
            }
        }

        let referenced: HashSet<Address> = resolved
            .values()
            .flat_map(|entry| entry.next.iter().copied())
            .collect();
        let heads: Vec<Address> = order
            .iter()
            .copied()
            .filter(|address| !referenced.contains(address))
            .collect();
        let entries: Vec<Entry> = order
            .iter()
            .filter_map(|address| resolved.remove(address))
            .collect();

        debug!(
            resolved = entries.len(),
            heads = heads.len(),
            "traversal complete"
        );
        Ok(FetchResult { entries, heads })
    }
}

/// Completes at `deadline`, or never.
async fn expired(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => future::pending().await,
    }
}
