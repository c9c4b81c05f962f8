//! Shared memory block for weft workers.
//!
//! One contiguous block is shared by the coordinator and every worker
//! thread. This crate plans how the block is carved into named regions,
//! owns the block itself, and hands out typed views over each region.
//!
//! # Architecture
//!
//! ```text
//! LayoutConfig ──compute──▶ MemoryLayout (RegionId → MemoryRegion, canonical order)
//!                                │
//! SharedBlock (Box<[AtomicU32]>) ┴──view──▶ BlockView
//!                                           ├── FrameBuffer   (RGBA pixels)
//!                                           ├── cells         (sync / sleep words)
//!                                           ├── ByteRegion    (asset tables)
//!                                           ├── InputKeys
//!                                           ├── HrTimer
//!                                           └── MemCounters
//! RegionHeap: bump allocator over a heap region (offsets only)
//! ```
//!
//! Every worker recomputes the layout from the same configuration; the
//! offset table is never shipped between threads.
//!
//! The block is an array of 32-bit atomics, so every access is safe
//! code. Plain data regions use relaxed loads and stores and rely on the
//! barrier's sequentially consistent handshake for visibility.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod block;
pub mod heap;
pub mod layout;
pub mod view;

pub use block::SharedBlock;
pub use heap::{HeapSpan, RegionHeap};
pub use layout::{compute, MemoryLayout, MemoryRegion, RegionId, REGION_ALIGN};
pub use view::{rgba, BlockView, ByteRegion, FrameBuffer, HrTimer, InputKeys, MemCounters};
