//! Barrier synchronisation between the weft coordinator and its workers.
//!
//! Each worker owns one 32-bit cell in the sync region. The coordinator
//! stores [`GO`] and wakes the worker; the worker does its frame work,
//! stores [`IDLE`] and wakes the coordinator. Every transition is a
//! sequentially consistent atomic followed by an address-keyed notify,
//! so all writes a worker made before clearing its cell are visible to
//! the coordinator once its wait returns.
//!
//! ```text
//! coordinator            cell[i]            worker i
//!   go(i)      ── 0 → 1 ──▶                 wait_go(i) returns
//!                                           ...frame work...
//!   wait_done(i) ◀── 1 → 0 ──               signal_done(i)
//! ```
//!
//! Parking is built on `parking_lot_core`, keyed by the cell's address.
//! The `wait` module is the only place in weft that uses `unsafe`.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod barrier;
pub mod sleep;
pub mod wait;

pub use barrier::{CellState, Signal, SyncArray, EXIT, GO, IDLE};
pub use sleep::{SleepArray, SleepOutcome};
pub use wait::{notify_all, wait_while, WaitResult};
