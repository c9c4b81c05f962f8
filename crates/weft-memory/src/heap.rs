//! Bump allocation of byte spans inside a heap region.
//!
//! A [`RegionHeap`] hands out aligned, non-overlapping spans from one
//! heap region (a worker's private heap or the shared heap). It tracks
//! offsets only; the bytes themselves live in the [`SharedBlock`].
//! Spans are never returned: arenas reuse their own slots, and the heap
//! lives as long as the block.
//!
//! [`SharedBlock`]: crate::SharedBlock

use weft_core::AllocError;

use crate::layout::{align_up_to, MemoryRegion};

/// A span handed out by a [`RegionHeap`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HeapSpan {
    /// Absolute byte offset within the shared block.
    pub offset: usize,
    /// Length in bytes.
    pub len: usize,
}

impl HeapSpan {
    /// One past the last byte.
    pub fn end(&self) -> usize {
        self.offset + self.len
    }
}

/// Bump allocator over one heap region.
#[derive(Clone, Debug)]
pub struct RegionHeap {
    name: &'static str,
    base: usize,
    size: usize,
    /// Next free byte, relative to `base`.
    cursor: usize,
}

impl RegionHeap {
    /// A heap covering `region`.
    pub fn new(region: MemoryRegion) -> Self {
        Self {
            name: region.id.name(),
            base: region.offset,
            size: region.size,
            cursor: 0,
        }
    }

    /// Reserve `len` bytes aligned to `align` (rounded up to a power of two).
    ///
    /// Alignment is relative to the start of the block, so a span aligned
    /// here keeps its alignment for any word view of the block.
    ///
    /// # Errors
    ///
    /// [`AllocError::Overflow`] if the span does not fit in what remains.
    pub fn alloc(&mut self, len: usize, align: usize) -> Result<HeapSpan, AllocError> {
        let align = align.max(1).checked_next_power_of_two().ok_or_else(|| {
            AllocError::InvalidArena {
                reason: format!("alignment {align} is not representable"),
            }
        })?;
        let overflow = |requested| AllocError::Overflow {
            region: self.name,
            requested,
            remaining: self.remaining(),
        };
        let here = self.base + self.cursor;
        let start = align_up_to(here, align).ok_or_else(|| overflow(len))?;
        let end = start.checked_add(len).ok_or_else(|| overflow(len))?;
        if end > self.base + self.size {
            return Err(overflow(end - here));
        }
        self.cursor = end - self.base;
        Ok(HeapSpan { offset: start, len })
    }

    /// Bytes handed out so far, including alignment padding.
    pub fn used(&self) -> usize {
        self.cursor
    }

    /// Bytes still available (before alignment of the next request).
    pub fn remaining(&self) -> usize {
        self.size - self.cursor
    }

    /// Total bytes in the region.
    pub fn capacity(&self) -> usize {
        self.size
    }

    /// The region name, for diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::RegionId;
    use proptest::prelude::*;

    fn heap(offset: usize, size: usize) -> RegionHeap {
        RegionHeap::new(MemoryRegion {
            id: RegionId::SharedHeap,
            offset,
            size,
        })
    }

    #[test]
    fn spans_are_sequential_and_aligned() {
        let mut h = heap(64, 128);
        let a = h.alloc(3, 1).unwrap();
        assert_eq!(a, HeapSpan { offset: 64, len: 3 });
        let b = h.alloc(8, 8).unwrap();
        assert_eq!(b.offset, 72);
        assert_eq!(h.used(), 16);
        assert_eq!(h.remaining(), 112);
    }

    #[test]
    fn non_power_of_two_alignment_rounds_up() {
        let mut h = heap(0, 64);
        h.alloc(1, 1).unwrap();
        let s = h.alloc(4, 3).unwrap();
        assert_eq!(s.offset, 4);
    }

    #[test]
    fn overflow_reports_region() {
        let mut h = heap(0, 16);
        h.alloc(10, 1).unwrap();
        let err = h.alloc(10, 1).unwrap_err();
        assert_eq!(
            err,
            AllocError::Overflow {
                region: "shared_heap",
                requested: 10,
                remaining: 6,
            }
        );
        // A failed request leaves the cursor untouched.
        assert_eq!(h.used(), 10);
        assert!(h.alloc(6, 1).is_ok());
    }

    #[test]
    fn exact_fit_succeeds() {
        let mut h = heap(8, 32);
        assert!(h.alloc(32, 8).is_ok());
        assert_eq!(h.remaining(), 0);
        assert!(h.alloc(1, 1).is_err());
    }

    #[test]
    fn zero_sized_heap_rejects_everything() {
        let mut h = heap(0, 0);
        assert!(h.alloc(1, 1).is_err());
        assert!(h.alloc(0, 1).is_ok());
    }

    proptest! {
        #[test]
        fn spans_never_overlap(
            requests in prop::collection::vec((0usize..40, 0u32..5), 1..60),
        ) {
            let mut h = heap(24, 512);
            let mut spans: Vec<HeapSpan> = Vec::new();
            for (len, align_lg2) in requests {
                let align = 1usize << align_lg2;
                if let Ok(s) = h.alloc(len, align) {
                    prop_assert_eq!(s.offset % align, 0);
                    prop_assert!(s.offset >= 24 && s.end() <= 24 + 512);
                    for prev in &spans {
                        prop_assert!(s.offset >= prev.end() || s.len == 0 || prev.len == 0);
                    }
                    spans.push(s);
                }
            }
        }
    }
}
