//! Lamport clock used to order log entries.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Scalar logical time owned by one actor.
///
/// Clocks are values: every operation returns a new clock and leaves the
/// receiver untouched. Once a clock is attached to an entry it never changes.
///
/// The total order compares `time` first and breaks ties with the
/// owner `id` (smaller id sorts first).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LamportClock {
    /// Owning actor: a public key or a caller-supplied node id.
    pub id: String,
    /// Logical time.
    pub time: u64,
}

impl LamportClock {
    /// Create a clock for `id` at `time`.
    pub fn new(id: impl Into<String>, time: u64) -> Self {
        Self {
            id: id.into(),
            time,
        }
    }

    /// Compare two clocks by time only. Callers break ties using `id`.
    pub fn compare(a: &Self, b: &Self) -> Ordering {
        a.time.cmp(&b.time)
    }

    /// Local tick: same owner, `time + 1`. Saturates at `u64::MAX`.
    pub fn tick(&self) -> Self {
        Self::new(self.id.clone(), self.time.saturating_add(1))
    }

    /// Like [`tick`](Self::tick), but `None` once time is exhausted.
    pub fn checked_tick(&self) -> Option<Self> {
        let time = self.time.checked_add(1)?;
        Some(Self::new(self.id.clone(), time))
    }

    /// Observe a remote clock: same owner, `time = max(self, other)`.
    pub fn merge(&self, other: &Self) -> Self {
        Self::new(self.id.clone(), self.time.max(other.time))
    }

    /// Observe a remote clock, then tick: `time = max(self, other) + 1`.
    pub fn advance(&self, other: &Self) -> Self {
        self.merge(other).tick()
    }
}

impl Ord for LamportClock {
    fn cmp(&self, other: &Self) -> Ordering {
        Self::compare(self, other).then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for LamportClock {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
