//! Address-keyed wait and notify on a single atomic cell.
//!
//! [`wait_while`] blocks the calling thread while a cell holds an
//! expected value; [`notify_all`] wakes every thread blocked on that
//! cell. The cell's address is the parking key, so any `AtomicU32` can
//! be waited on without extra state.

#![allow(unsafe_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

use parking_lot_core::{ParkResult, DEFAULT_PARK_TOKEN, DEFAULT_UNPARK_TOKEN};

/// Why [`wait_while`] returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitResult {
    /// The cell did not hold the expected value; the thread never parked.
    NotEqual,
    /// The thread parked and was woken by a notify (or spuriously).
    Woken,
    /// The deadline passed before a notify arrived.
    TimedOut,
}

fn key(cell: &AtomicU32) -> usize {
    cell as *const AtomicU32 as usize
}

/// Block while `cell` holds `expected`, until notified or `deadline` passes.
///
/// Callers re-check the cell after `Woken`: a wake does not guarantee
/// the value changed.
pub fn wait_while(cell: &AtomicU32, expected: u32, deadline: Option<Instant>) -> WaitResult {
    if cell.load(Ordering::SeqCst) != expected {
        return WaitResult::NotEqual;
    }
    // SAFETY: the key is the address of `cell`, which this crate owns the
    // parking protocol for; no other primitive parks on block cells. The
    // validate closure only performs an atomic load and cannot panic, and
    // neither callback calls back into parking_lot_core.
    let result = unsafe {
        parking_lot_core::park(
            key(cell),
            || cell.load(Ordering::SeqCst) == expected,
            || {},
            |_, _| {},
            DEFAULT_PARK_TOKEN,
            deadline,
        )
    };
    match result {
        ParkResult::Unparked(_) => WaitResult::Woken,
        ParkResult::Invalid => WaitResult::NotEqual,
        ParkResult::TimedOut => WaitResult::TimedOut,
    }
}

/// Wake every thread blocked on `cell`. Returns how many were woken.
pub fn notify_all(cell: &AtomicU32) -> usize {
    // SAFETY: same key discipline as `wait_while`; unparking a key with no
    // waiters is a no-op.
    unsafe { parking_lot_core::unpark_all(key(cell), DEFAULT_UNPARK_TOKEN) }
}
