//! An [`ObjectStore`] wrapper that adds configurable random IO latency.
//!
//! `SlowStore` wraps any `Arc<dyn ObjectStore>` and sleeps for a random
//! duration before each read or write. The RNG is seeded so runs are
//! reproducible.
//!
//! # Example
//!
//! ```ignore
//! let slow = SlowStore::new(inner)
//!     .read_latency(5, 20)    // 5–20 ms per read
//!     .write_latency(0, 2)    // 0–2 ms per write
//!     .seed(42);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use strand_types::Address;

use crate::error::StoreError;
use crate::traits::ObjectStore;

/// An [`ObjectStore`] wrapper that injects random latency before IO.
///
/// Reads complete out of request order, which is what traversal code has to
/// cope with against a real networked store. The wrapper also records the
/// peak number of concurrent reads it has seen.
pub struct SlowStore {
    inner: Arc<dyn ObjectStore>,
    read_latency_ms: (u64, u64),
    write_latency_ms: (u64, u64),
    rng: Mutex<StdRng>,
    reads_in_flight: AtomicUsize,
    peak_reads: AtomicUsize,
}

impl SlowStore {
    /// Wrap an existing store with zero latency (pass-through) by default.
    pub fn new(inner: Arc<dyn ObjectStore>) -> Self {
        Self {
            inner,
            read_latency_ms: (0, 0),
            write_latency_ms: (0, 0),
            rng: Mutex::new(StdRng::seed_from_u64(0)),
            reads_in_flight: AtomicUsize::new(0),
            peak_reads: AtomicUsize::new(0),
        }
    }

    /// Set the read latency range in milliseconds (uniform random).
    pub fn read_latency(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.read_latency_ms = (min_ms, max_ms);
        self
    }

    /// Set the write latency range in milliseconds (uniform random).
    pub fn write_latency(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.write_latency_ms = (min_ms, max_ms);
        self
    }

    /// Set the RNG seed for deterministic behaviour.
    pub fn seed(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..self
        }
    }

    /// Highest number of `get` calls observed in flight at once.
    pub fn peak_concurrent_reads(&self) -> usize {
        self.peak_reads.load(Ordering::SeqCst)
    }

    /// Sleep for a random duration in `[min, max]` milliseconds.
    async fn delay(&self, range: (u64, u64)) {
        let (min, max) = range;

        if max == 0 {
            return;
        }

        let ms = if min >= max {
            max
        } else {
            self.rng
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .random_range(min..=max)
        };

        if ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(ms)).await;
        }
    }
}

/// Decrements the in-flight read counter even if the read future is dropped.
struct ReadGuard<'a>(&'a AtomicUsize);

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl ObjectStore for SlowStore {
    async fn put(&self, data: Bytes) -> Result<Address, StoreError> {
        self.delay(self.write_latency_ms).await;
        self.inner.put(data).await
    }

    async fn get(&self, address: Address) -> Result<Option<Bytes>, StoreError> {
        let now = self.reads_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = ReadGuard(&self.reads_in_flight);
        self.peak_reads.fetch_max(now, Ordering::SeqCst);

        self.delay(self.read_latency_ms).await;
        self.inner.get(address).await
    }

    async fn delete(&self, address: Address) -> Result<(), StoreError> {
        self.delay(self.write_latency_ms).await;
        self.inner.delete(address).await
    }
}
