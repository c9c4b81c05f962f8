//! The per-worker two-phase handshake.
//!
//! One cell per worker, written by exactly two parties in strict
//! alternation: the coordinator moves it `IDLE → GO`, the worker moves it
//! `GO → IDLE`. Both moves are compare-and-swap, so neither side ever
//! overwrites a value it did not expect. [`EXIT`] is a terminal value
//! used only at teardown.
//!
//! No ordering holds between workers; each worker is paired with the
//! coordinator alone.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use smallvec::SmallVec;
use weft_core::{StallError, WorkerIdx};

use crate::wait::{notify_all, wait_while, WaitResult};

/// Cell value: idle, or frame work done.
pub const IDLE: u32 = 0;
/// Cell value: frame work assigned, not yet done.
pub const GO: u32 = 1;
/// Cell value: the worker must leave its loop.
pub const EXIT: u32 = 2;

/// Decoded value of a sync cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellState {
    /// Idle or done.
    Idle,
    /// Work assigned.
    Go,
    /// Teardown requested.
    Exit,
    /// Any other value; never written by this crate.
    Unknown(u32),
}

impl From<u32> for CellState {
    fn from(v: u32) -> Self {
        match v {
            IDLE => CellState::Idle,
            GO => CellState::Go,
            EXIT => CellState::Exit,
            other => CellState::Unknown(other),
        }
    }
}

/// What a parked worker was woken for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signal {
    /// Perform this frame's work, then call [`SyncArray::signal_done`].
    Go,
    /// Leave the worker loop.
    Exit,
}

/// The sync region viewed as one handshake cell per worker.
///
/// Cell 0 belongs to the coordinator's own share and is never used by
/// the handshake; aux workers are `1..len`.
#[derive(Clone, Copy)]
pub struct SyncArray<'a> {
    cells: &'a [AtomicU32],
}

impl<'a> SyncArray<'a> {
    /// Wrap the sync region's cells.
    pub fn new(cells: &'a [AtomicU32]) -> Self {
        Self { cells }
    }

    /// Number of cells, equal to the worker count.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether there are no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Current state of `worker`'s cell.
    pub fn state(&self, worker: WorkerIdx) -> CellState {
        CellState::from(self.cell(worker).load(Ordering::SeqCst))
    }

    fn cell(&self, worker: WorkerIdx) -> &'a AtomicU32 {
        &self.cells[worker.as_usize()]
    }

    fn aux(&self) -> impl Iterator<Item = WorkerIdx> {
        WorkerIdx::aux(self.cells.len() as u32)
    }

    // ── Coordinator side ───────────────────────────────────────────

    /// Assign work to `worker` and wake it.
    ///
    /// Returns `false`, leaving the cell untouched, if the cell is not
    /// idle: a worker still busy from a stalled frame is never written
    /// over.
    pub fn go(&self, worker: WorkerIdx) -> bool {
        let cell = self.cell(worker);
        match cell.compare_exchange(IDLE, GO, Ordering::SeqCst, Ordering::SeqCst) {
            Ok(_) => {
                notify_all(cell);
                true
            }
            Err(_) => false,
        }
    }

    /// Assign work to every aux worker. Returns the workers that were
    /// skipped because their cell was not idle.
    pub fn go_all(&self) -> SmallVec<[WorkerIdx; 8]> {
        self.aux().filter(|&w| !self.go(w)).collect()
    }

    /// Block until `worker` leaves the `GO` state.
    ///
    /// With no deadline this waits indefinitely; a worker that never
    /// finishes hangs the caller.
    ///
    /// # Errors
    ///
    /// [`StallError::LivenessStall`] if `deadline` passes first.
    pub fn wait_done(&self, worker: WorkerIdx, deadline: Option<Instant>) -> Result<(), StallError> {
        let cell = self.cell(worker);
        let started = Instant::now();
        while cell.load(Ordering::SeqCst) == GO {
            if wait_while(cell, GO, deadline) == WaitResult::TimedOut
                && cell.load(Ordering::SeqCst) == GO
            {
                return Err(StallError::LivenessStall {
                    worker,
                    waited_ms: started.elapsed().as_millis() as u64,
                });
            }
        }
        Ok(())
    }

    /// Block until every aux worker is done.
    ///
    /// `timeout`, if set, bounds the whole wait, not each worker.
    ///
    /// # Errors
    ///
    /// [`StallError::LivenessStall`] naming the first worker found still
    /// busy at the deadline.
    pub fn wait_all_done(&self, timeout: Option<Duration>) -> Result<(), StallError> {
        self.wait_issued_done(&[], timeout)
    }

    /// Block until every aux worker except `skipped` is done.
    ///
    /// Pass the workers [`go_all`](Self::go_all) skipped: they are still
    /// inside an earlier frame and their rows belong to it.
    ///
    /// # Errors
    ///
    /// As [`wait_all_done`](Self::wait_all_done).
    pub fn wait_issued_done(&self, skipped: &[WorkerIdx], timeout: Option<Duration>) -> Result<(), StallError> {
        let deadline = timeout.map(|t| Instant::now() + t);
        for worker in self.aux().filter(|w| !skipped.contains(w)) {
            self.wait_done(worker, deadline)?;
        }
        Ok(())
    }

    /// Store [`EXIT`] into every aux cell and wake all workers.
    ///
    /// Busy workers finish their frame and then observe `EXIT` on their
    /// next wait.
    pub fn release_all(&self) {
        let mut woken = 0;
        for worker in self.aux() {
            let cell = self.cell(worker);
            cell.store(EXIT, Ordering::SeqCst);
            woken += notify_all(cell);
        }
        tracing::debug!(workers = self.cells.len().saturating_sub(1), woken, "sync cells released");
    }

    // ── Worker side ────────────────────────────────────────────────

    /// Park until the coordinator assigns work or requests exit.
    pub fn wait_go(&self, worker: WorkerIdx) -> Signal {
        let cell = self.cell(worker);
        loop {
            match cell.load(Ordering::SeqCst) {
                GO => return Signal::Go,
                EXIT => return Signal::Exit,
                current => {
                    wait_while(cell, current, None);
                }
            }
        }
    }

    /// Mark `worker`'s frame work done and wake the coordinator.
    ///
    /// All writes made by this thread before the call are visible to the
    /// coordinator once its `wait_done` returns. An `EXIT` stored in the
    /// meantime is left in place.
    pub fn signal_done(&self, worker: WorkerIdx) {
        let cell = self.cell(worker);
        if cell
            .compare_exchange(GO, IDLE, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            notify_all(cell);
        }
    }
}

impl std::fmt::Debug for SyncArray<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let states: Vec<CellState> = self
            .cells
            .iter()
            .map(|c| CellState::from(c.load(Ordering::Relaxed)))
            .collect();
        f.debug_struct("SyncArray").field("cells", &states).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::thread;

    fn cells(n: usize) -> Vec<AtomicU32> {
        (0..n).map(|_| AtomicU32::new(IDLE)).collect()
    }

    #[test]
    fn go_moves_idle_to_go() {
        let c = cells(3);
        let sync = SyncArray::new(&c);
        assert!(sync.go(WorkerIdx(1)));
        assert_eq!(sync.state(WorkerIdx(1)), CellState::Go);
        assert_eq!(sync.state(WorkerIdx(2)), CellState::Idle);
    }

    #[test]
    fn go_skips_busy_worker() {
        let c = cells(3);
        let sync = SyncArray::new(&c);
        assert!(sync.go(WorkerIdx(2)));
        assert!(!sync.go(WorkerIdx(2)));
        let skipped = sync.go_all();
        assert_eq!(skipped.as_slice(), &[WorkerIdx(2)]);
        assert_eq!(sync.state(WorkerIdx(1)), CellState::Go);
    }

    #[test]
    fn go_all_leaves_coordinator_cell_alone() {
        let c = cells(4);
        let sync = SyncArray::new(&c);
        assert!(sync.go_all().is_empty());
        assert_eq!(sync.state(WorkerIdx::COORDINATOR), CellState::Idle);
        for w in WorkerIdx::aux(4) {
            assert_eq!(sync.state(w), CellState::Go);
        }
    }

    #[test]
    fn signal_done_returns_to_idle() {
        let c = cells(2);
        let sync = SyncArray::new(&c);
        sync.go(WorkerIdx(1));
        sync.signal_done(WorkerIdx(1));
        assert_eq!(sync.state(WorkerIdx(1)), CellState::Idle);
        assert!(sync.wait_done(WorkerIdx(1), None).is_ok());
    }

    #[test]
    fn signal_done_preserves_exit() {
        let c = cells(2);
        let sync = SyncArray::new(&c);
        sync.go(WorkerIdx(1));
        sync.release_all();
        sync.signal_done(WorkerIdx(1));
        assert_eq!(sync.state(WorkerIdx(1)), CellState::Exit);
        assert_eq!(sync.wait_go(WorkerIdx(1)), Signal::Exit);
    }

    #[test]
    fn stalled_worker_reported_after_deadline() {
        let c = cells(3);
        let sync = SyncArray::new(&c);
        sync.go_all();
        sync.signal_done(WorkerIdx(1));
        let err = sync
            .wait_all_done(Some(Duration::from_millis(20)))
            .unwrap_err();
        match err {
            StallError::LivenessStall { worker, waited_ms } => {
                assert_eq!(worker, WorkerIdx(2));
                assert!(waited_ms >= 10);
            }
        }
    }

    #[test]
    fn skipped_workers_are_not_waited_on() {
        let c = cells(3);
        let sync = SyncArray::new(&c);
        assert!(sync.go(WorkerIdx(1)));
        // Worker 1 never finishes; worker 2 is issued and done.
        let skipped = sync.go_all();
        assert_eq!(skipped.as_slice(), &[WorkerIdx(1)]);
        sync.signal_done(WorkerIdx(2));
        let start = Instant::now();
        assert!(sync
            .wait_issued_done(&skipped, Some(Duration::from_secs(5)))
            .is_ok());
        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(sync.state(WorkerIdx(1)), CellState::Go);
    }

    #[test]
    fn unknown_values_decode() {
        assert_eq!(CellState::from(7), CellState::Unknown(7));
    }

    #[test]
    fn handshake_across_threads() {
        let c: Arc<Vec<AtomicU32>> = Arc::new(cells(2));
        let worker = {
            let c = Arc::clone(&c);
            thread::spawn(move || {
                let sync = SyncArray::new(&c);
                let mut frames = 0;
                while sync.wait_go(WorkerIdx(1)) == Signal::Go {
                    frames += 1;
                    sync.signal_done(WorkerIdx(1));
                }
                frames
            })
        };
        let sync = SyncArray::new(&c);
        for _ in 0..100 {
            assert!(sync.go_all().is_empty());
            sync.wait_all_done(None).unwrap();
        }
        sync.release_all();
        assert_eq!(worker.join().unwrap(), 100);
    }

    proptest! {
        #[test]
        fn single_thread_handshake_never_overwrites(
            ops in prop::collection::vec((1u32..6, any::<bool>()), 0..64),
        ) {
            let c = cells(6);
            let sync = SyncArray::new(&c);
            for (w, assign) in ops {
                let worker = WorkerIdx(w);
                let before = sync.state(worker);
                if assign {
                    prop_assert_eq!(sync.go(worker), before == CellState::Idle);
                    prop_assert_eq!(sync.state(worker), CellState::Go);
                } else {
                    sync.signal_done(worker);
                    prop_assert_eq!(sync.state(worker), CellState::Idle);
                }
            }
            prop_assert_eq!(sync.state(WorkerIdx::COORDINATOR), CellState::Idle);
        }
    }
}
