//! Signed, content-addressed, conflict-free replicated log.
//!
//! A [`Log`] is a set of [`Entry`] values linked by parent hashes into a DAG.
//! Replicas append signed entries locally, publish only their head hashes,
//! and rebuild missing history from a shared [`ObjectStore`] with
//! [`EntryIo::fetch`]. [`Log::join`] merges two replicas into one causally
//! ordered set after checking every incoming entry's signature and write
//! access. Merging is commutative, associative and idempotent.
//!
//! [`ObjectStore`]: strand_store::ObjectStore

mod access;
mod config;
mod entry;
mod entry_io;
mod error;
mod log;

#[cfg(test)]
mod tests;

pub use access::{AccessController, AccessError, AccessFn, AllowAll, AllowList};
pub use config::{FetchSection, LogSection, StrandConfig};
pub use entry::{ENTRY_VERSION, Entry, MAX_CLOCK_TIME};
pub use entry_io::{DEFAULT_CONCURRENCY, EntryIo, FetchOptions, FetchProgress, FetchResult};
pub use error::LogError;
pub use log::{JoinOutcome, Log, LogBuilder};
