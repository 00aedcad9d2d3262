//! Content-addressed object storage for strand.
//!
//! This crate defines the [`ObjectStore`] trait the log engine reads and
//! writes encoded entries through, along with three backends:
//!
//! - [`MemoryStore`]: in-memory storage backed by a `RwLock<HashMap>`.
//! - [`FileStore`]: one file per object with a 2-level fan-out layout.
//! - [`SlowStore`]: wraps another store and injects random latency.

mod error;
mod file_store;
mod memory_store;
mod slow_store;
mod traits;

pub use error::StoreError;
pub use file_store::FileStore;
pub use memory_store::MemoryStore;
pub use slow_store::SlowStore;
pub use traits::ObjectStore;
