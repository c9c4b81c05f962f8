//! Fixed-object-size slab arenas for weft workers.
//!
//! An [`Arena`] reuses freed slots through a free list and grows by
//! whole blocks reserved from a [`RegionHeap`](weft_memory::RegionHeap).
//! The free list links slot indices, not addresses, and every live
//! object is reached through a unique [`ArenaHandle`] that `free`
//! consumes. Double free and use-after-free do not type-check.
//!
//! ```text
//! Arena<T>
//! ├── slots: Vec<Slot<T>>      Occupied(T) | Vacant { next }
//! ├── free_head ──▶ Vacant ──▶ Vacant ──▶ None
//! └── blocks: Vec<HeapSpan>    one per `objects_per_block` slots
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod arena;
pub mod config;
pub mod handle;

pub use arena::Arena;
pub use config::ArenaConfig;
pub use handle::ArenaHandle;
