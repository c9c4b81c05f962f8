//! Timed park cells, one per worker.
//!
//! A worker that has nothing to do for a while sleeps on its own cell
//! instead of spinning. Any thread may cut the sleep short with
//! [`SleepArray::wake`]. A wake that arrives before the sleep starts is
//! kept as a pending permit and consumed by the next sleep.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use weft_core::WorkerIdx;

use crate::wait::{notify_all, wait_while, WaitResult};

const ASLEEP: u32 = 0;
const WOKEN: u32 = 1;

/// How a sleep ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SleepOutcome {
    /// Another thread called [`SleepArray::wake`].
    Woken,
    /// The full duration elapsed.
    TimedOut,
}

/// The sleep region viewed as one park cell per worker.
#[derive(Clone, Copy, Debug)]
pub struct SleepArray<'a> {
    cells: &'a [AtomicU32],
}

impl<'a> SleepArray<'a> {
    /// Wrap the sleep region's cells.
    pub fn new(cells: &'a [AtomicU32]) -> Self {
        Self { cells }
    }

    /// Park the calling thread on `worker`'s cell for up to `duration`.
    ///
    /// A worker with no cell returns [`SleepOutcome::TimedOut`] at once,
    /// the same way [`wake`](Self::wake) ignores it.
    pub fn sleep(&self, worker: WorkerIdx, duration: Duration) -> SleepOutcome {
        let Some(cell) = self.cells.get(worker.as_usize()) else {
            return SleepOutcome::TimedOut;
        };
        let deadline = Instant::now() + duration;
        loop {
            if cell.swap(ASLEEP, Ordering::SeqCst) == WOKEN {
                return SleepOutcome::Woken;
            }
            if wait_while(cell, ASLEEP, Some(deadline)) == WaitResult::TimedOut {
                // A wake may have raced the deadline.
                return if cell.swap(ASLEEP, Ordering::SeqCst) == WOKEN {
                    SleepOutcome::Woken
                } else {
                    SleepOutcome::TimedOut
                };
            }
        }
    }

    /// Wake `worker` if sleeping, or leave a permit for its next sleep.
    pub fn wake(&self, worker: WorkerIdx) {
        if let Some(cell) = self.cells.get(worker.as_usize()) {
            cell.store(WOKEN, Ordering::SeqCst);
            notify_all(cell);
        }
    }

    /// Wake every worker.
    pub fn wake_all(&self) {
        for idx in 0..self.cells.len() as u32 {
            self.wake(WorkerIdx(idx));
        }
    }
}
