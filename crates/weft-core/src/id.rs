//! Strongly-typed worker identifiers.

use std::fmt;

/// Index of a worker sharing the memory block.
///
/// Worker 0 is the coordinator's own share of the frame work; aux worker
/// threads are numbered `1..num_workers`. The index selects the worker's
/// sync cell, sleep cell, heap sub-region, and memory counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerIdx(pub u32);

impl WorkerIdx {
    /// The coordinator's own worker slot.
    pub const COORDINATOR: WorkerIdx = WorkerIdx(0);

    /// Whether this index belongs to the coordinator rather than an aux thread.
    pub fn is_coordinator(self) -> bool {
        self == Self::COORDINATOR
    }

    /// The index as a `usize`, for slicing per-worker arrays.
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// Iterate over the aux worker indices `1..num_workers`.
    pub fn aux(num_workers: u32) -> impl Iterator<Item = WorkerIdx> {
        (1..num_workers).map(WorkerIdx)
    }
}

impl fmt::Display for WorkerIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for WorkerIdx {
    fn from(v: u32) -> Self {
        Self(v)
    }
}
