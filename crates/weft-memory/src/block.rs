//! The shared memory block.

use std::sync::atomic::AtomicU32;

use crate::layout::{MemoryLayout, MemoryRegion};
use crate::view::BlockView;

const WORD_BYTES: usize = 4;

/// One contiguous, zero-initialised block of 32-bit atomic words.
///
/// The block is shared between threads behind an `Arc`. It carries no
/// layout of its own: callers pair it with a [`MemoryLayout`] they
/// computed from the configuration and obtain typed views through
/// [`SharedBlock::view`].
pub struct SharedBlock {
    words: Box<[AtomicU32]>,
}

// Compile-time assertion: SharedBlock must be Send + Sync to cross threads.
const _: fn() = || {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<SharedBlock>();
};

impl SharedBlock {
    /// Allocate a zeroed block sized for `layout`.
    pub fn new(layout: &MemoryLayout) -> Self {
        Self::with_len(layout.total_size())
    }

    /// Allocate a zeroed block of at least `len_bytes`, rounded up to
    /// whole 32-bit words.
    pub fn with_len(len_bytes: usize) -> Self {
        let words = len_bytes.div_ceil(WORD_BYTES);
        Self {
            words: (0..words).map(|_| AtomicU32::new(0)).collect(),
        }
    }

    /// Size of the block in bytes.
    pub fn len_bytes(&self) -> usize {
        self.words.len() * WORD_BYTES
    }

    /// Whether `layout` describes exactly this block.
    pub fn matches(&self, layout: &MemoryLayout) -> bool {
        self.len_bytes() == layout.total_size()
    }

    /// The words backing `region`.
    ///
    /// # Panics
    ///
    /// Panics if the region lies outside the block. Regions from a layout
    /// that [`matches`](Self::matches) this block are always in bounds.
    pub fn region_words(&self, region: &MemoryRegion) -> &[AtomicU32] {
        let start = region.offset / WORD_BYTES;
        let end = region.end().div_ceil(WORD_BYTES);
        &self.words[start..end]
    }

    /// Typed views over this block under `layout`.
    pub fn view<'a>(&'a self, layout: &'a MemoryLayout) -> BlockView<'a> {
        debug_assert!(self.matches(layout), "layout does not match block");
        BlockView::new(self, layout)
    }
}

impl std::fmt::Debug for SharedBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedBlock")
            .field("len_bytes", &self.len_bytes())
            .finish()
    }
}
