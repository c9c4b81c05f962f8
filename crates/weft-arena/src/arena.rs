//! Index-based slab arena with block growth from a region heap.

use std::sync::atomic::{AtomicU32, Ordering};

use weft_core::AllocError;
use weft_memory::{HeapSpan, RegionHeap};

use crate::config::ArenaConfig;
use crate::handle::ArenaHandle;

/// Source of distinct arena ids, used to catch handles from another arena.
static NEXT_ARENA_ID: AtomicU32 = AtomicU32::new(1);

enum Slot<T> {
    Vacant { next: Option<u32> },
    Occupied(T),
}

/// Fixed-object-size allocator with O(1) `alloc` and `free`.
///
/// Freed slots go to the head of an index free list and are reused
/// first (LIFO). When the free list is empty the next slot of the
/// current block is used; when the block is full a new block of
/// `objects_per_block` slots is reserved from the heap passed to
/// [`alloc`](Self::alloc).
///
/// The arena owns every object. The heap reservation gives each slot a
/// stable byte address in the shared block (see [`address`](Self::address))
/// and accounts the arena's footprint against its heap region.
pub struct Arena<T> {
    id: u32,
    config: ArenaConfig,
    slot_size: usize,
    slots: Vec<Slot<T>>,
    blocks: Vec<HeapSpan>,
    free_head: Option<u32>,
    live: usize,
}

impl<T> Arena<T> {
    /// Create an empty arena. No block is reserved until the first `alloc`.
    ///
    /// # Errors
    ///
    /// [`AllocError::InvalidArena`] if the configuration cannot form a
    /// block, or its slots are too small or too loosely aligned for `T`.
    pub fn new(config: ArenaConfig) -> Result<Self, AllocError> {
        config.validate()?;
        let slot_size = config.slot_size().ok_or_else(|| AllocError::InvalidArena {
            reason: "slot size overflows".to_string(),
        })?;
        if slot_size < std::mem::size_of::<T>() || config.align() < std::mem::align_of::<T>() {
            return Err(AllocError::InvalidArena {
                reason: format!(
                    "slot of {slot_size} bytes aligned to {} cannot hold {}",
                    config.align(),
                    std::any::type_name::<T>()
                ),
            });
        }
        Ok(Self {
            id: NEXT_ARENA_ID.fetch_add(1, Ordering::Relaxed),
            config,
            slot_size,
            slots: Vec::new(),
            blocks: Vec::new(),
            free_head: None,
            live: 0,
        })
    }

    /// Create an arena sized for `T` with `objects_per_block` slots per block.
    pub fn for_type(objects_per_block: usize) -> Result<Self, AllocError> {
        Self::new(ArenaConfig::for_type::<T>(objects_per_block))
    }

    /// Store `value` and return its handle.
    ///
    /// # Errors
    ///
    /// [`AllocError::Overflow`] if a new block is needed and `heap` cannot
    /// supply it. The arena is unchanged in that case.
    pub fn alloc(&mut self, heap: &mut RegionHeap, value: T) -> Result<ArenaHandle<T>, AllocError> {
        if let Some(index) = self.free_head {
            let slot = &mut self.slots[index as usize];
            let Slot::Vacant { next } = *slot else {
                unreachable!("free list head {index} is occupied");
            };
            self.free_head = next;
            *slot = Slot::Occupied(value);
            self.live += 1;
            return Ok(ArenaHandle::new(self.id, index));
        }

        if self.slots.len() == self.blocks.len() * self.config.objects_per_block {
            self.grow(heap)?;
        }

        let index = u32::try_from(self.slots.len()).map_err(|_| AllocError::InvalidArena {
            reason: "arena exceeds u32::MAX slots".to_string(),
        })?;
        self.slots.push(Slot::Occupied(value));
        self.live += 1;
        Ok(ArenaHandle::new(self.id, index))
    }

    /// Release the object behind `handle` and return it.
    ///
    /// # Panics
    ///
    /// Panics if `handle` was issued by a different arena.
    pub fn free(&mut self, handle: ArenaHandle<T>) -> T {
        assert_eq!(handle.arena, self.id, "handle freed into a foreign arena");
        let slot = std::mem::replace(
            &mut self.slots[handle.index as usize],
            Slot::Vacant {
                next: self.free_head,
            },
        );
        match slot {
            Slot::Occupied(value) => {
                self.free_head = Some(handle.index);
                self.live -= 1;
                value
            }
            Slot::Vacant { .. } => unreachable!("live handle {} points at a vacant slot", handle.index),
        }
    }

    /// Borrow the object behind `handle`, or `None` for a foreign handle.
    pub fn get(&self, handle: &ArenaHandle<T>) -> Option<&T> {
        if handle.arena != self.id {
            return None;
        }
        match self.slots.get(handle.index as usize) {
            Some(Slot::Occupied(value)) => Some(value),
            _ => None,
        }
    }

    /// Mutably borrow the object behind `handle`, or `None` for a foreign handle.
    pub fn get_mut(&mut self, handle: &ArenaHandle<T>) -> Option<&mut T> {
        if handle.arena != self.id {
            return None;
        }
        match self.slots.get_mut(handle.index as usize) {
            Some(Slot::Occupied(value)) => Some(value),
            _ => None,
        }
    }

    /// Byte offset of `handle`'s slot within the shared block.
    ///
    /// Distinct live handles always have distinct addresses; a freed
    /// address may be handed out again.
    pub fn address(&self, handle: &ArenaHandle<T>) -> usize {
        debug_assert_eq!(handle.arena, self.id, "address of a foreign handle");
        let per_block = self.config.objects_per_block;
        let index = handle.index as usize;
        self.blocks[index / per_block].offset + (index % per_block) * self.slot_size
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Whether no objects are live.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Slots available without reserving another block.
    pub fn capacity(&self) -> usize {
        self.blocks.len() * self.config.objects_per_block
    }

    /// Blocks reserved so far.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Bytes per slot.
    pub fn slot_size(&self) -> usize {
        self.slot_size
    }

    /// Bytes reserved from heaps across all blocks.
    pub fn reserved_bytes(&self) -> usize {
        self.blocks.iter().map(|b| b.len).sum()
    }

    /// Iterate over live objects in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().filter_map(|slot| match slot {
            Slot::Occupied(value) => Some(value),
            Slot::Vacant { .. } => None,
        })
    }

    fn grow(&mut self, heap: &mut RegionHeap) -> Result<(), AllocError> {
        let bytes = self.slot_size * self.config.objects_per_block;
        let span = heap.alloc(bytes, self.config.align())?;
        tracing::debug!(
            arena = self.id,
            heap = heap.name(),
            offset = span.offset,
            bytes,
            blocks = self.blocks.len() + 1,
            "arena block reserved"
        );
        self.blocks.push(span);
        Ok(())
    }
}

impl<T> std::fmt::Debug for Arena<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("id", &self.id)
            .field("slot_size", &self.slot_size)
            .field("live", &self.live)
            .field("capacity", &self.capacity())
            .field("blocks", &self.blocks.len())
            .finish()
    }
}
