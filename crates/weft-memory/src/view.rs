//! Typed views over the regions of a [`SharedBlock`].
//!
//! Views are cheap borrowed wrappers created from a block plus its
//! layout. They never reinterpret memory; every access is a relaxed
//! atomic operation on the region's words. Cross-thread ordering comes
//! from the barrier handshake, not from the views.

use std::ops::Range;
use std::sync::atomic::{AtomicU32, Ordering};

use weft_core::{AllocError, WorkerIdx};

use crate::block::SharedBlock;
use crate::layout::{MemoryLayout, RegionId};

/// Pack an RGBA colour into the frame buffer's pixel encoding.
///
/// Bytes are laid out R, G, B, A in memory order (little-endian word).
pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> u32 {
    u32::from_le_bytes([r, g, b, a])
}

// ── BlockView ──────────────────────────────────────────────────────

/// Entry point for typed region access.
#[derive(Clone, Copy)]
pub struct BlockView<'a> {
    block: &'a SharedBlock,
    layout: &'a MemoryLayout,
}

impl<'a> BlockView<'a> {
    pub(crate) fn new(block: &'a SharedBlock, layout: &'a MemoryLayout) -> Self {
        Self { block, layout }
    }

    /// The layout this view was built with.
    pub fn layout(&self) -> &'a MemoryLayout {
        self.layout
    }

    fn words(&self, id: RegionId) -> &'a [AtomicU32] {
        self.block.region_words(&self.layout.region(id))
    }

    fn cells(&self, id: RegionId) -> &'a [AtomicU32] {
        let n = self.layout.num_workers() as usize;
        &self.words(id)[..n]
    }

    /// The RGBA frame buffer.
    pub fn frame_buffer(&self) -> FrameBuffer<'a> {
        let pixels = &self.words(RegionId::FrameBuffer)[..self.layout.frame_pixels()];
        FrameBuffer {
            pixels,
            width: self.layout.frame_width(),
            height: self.layout.frame_height(),
        }
    }

    /// One handshake cell per worker.
    pub fn sync_cells(&self) -> &'a [AtomicU32] {
        self.cells(RegionId::SyncArray)
    }

    /// One park cell per worker.
    pub fn sleep_cells(&self) -> &'a [AtomicU32] {
        self.cells(RegionId::SleepArray)
    }

    /// Per-worker heap usage counters.
    pub fn mem_counters(&self) -> MemCounters<'a> {
        MemCounters {
            cells: self.cells(RegionId::WorkerMemCounters),
        }
    }

    /// Keyboard state.
    pub fn input_keys(&self) -> InputKeys<'a> {
        InputKeys {
            bytes: ByteRegion {
                id: RegionId::InputKeys,
                words: self.words(RegionId::InputKeys),
                len: self.layout.input_keys(),
            },
        }
    }

    /// The frame start timestamp.
    pub fn hr_timer(&self) -> HrTimer<'a> {
        let words = self.words(RegionId::HrTimer);
        HrTimer {
            lo: &words[0],
            hi: &words[1],
        }
    }

    /// Byte-level access to any region, typically an asset table.
    pub fn bytes(&self, id: RegionId) -> ByteRegion<'a> {
        ByteRegion {
            id,
            words: self.words(id),
            len: self.layout.region(id).size,
        }
    }
}

// ── FrameBuffer ────────────────────────────────────────────────────

/// Row-major RGBA pixels, one 32-bit word each.
///
/// Each worker writes only the rows its partition assigns; the
/// coordinator reads the whole buffer after the barrier completes.
#[derive(Clone, Copy)]
pub struct FrameBuffer<'a> {
    pixels: &'a [AtomicU32],
    width: u32,
    height: u32,
}

impl<'a> FrameBuffer<'a> {
    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Total pixel count.
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    /// Whether the buffer has no pixels.
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Read pixel `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> u32 {
        self.pixels[self.index(x, y)].load(Ordering::Relaxed)
    }

    /// Write pixel `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are out of bounds.
    pub fn set_pixel(&self, x: u32, y: u32, value: u32) {
        self.pixels[self.index(x, y)].store(value, Ordering::Relaxed);
    }

    /// The pixels of row `y`.
    pub fn row(&self, y: u32) -> &'a [AtomicU32] {
        let start = y as usize * self.width as usize;
        &self.pixels[start..start + self.width as usize]
    }

    /// Fill every pixel of `rows` with `value`.
    pub fn fill_rows(&self, rows: Range<u32>, value: u32) {
        for y in rows {
            for px in self.row(y) {
                px.store(value, Ordering::Relaxed);
            }
        }
    }

    /// Copy every pixel into `out`, resizing it to [`len`](Self::len).
    pub fn copy_into(&self, out: &mut Vec<u32>) {
        out.clear();
        out.extend(self.pixels.iter().map(|p| p.load(Ordering::Relaxed)));
    }

    fn index(&self, x: u32, y: u32) -> usize {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
        y as usize * self.width as usize + x as usize
    }
}

// ── ByteRegion ─────────────────────────────────────────────────────

/// Byte-addressed access to a region.
///
/// Bytes are packed little-endian into the region's words. A region has
/// a single writer, so read-modify-write of a containing word never
/// races with another writer.
#[derive(Clone, Copy)]
pub struct ByteRegion<'a> {
    id: RegionId,
    words: &'a [AtomicU32],
    len: usize,
}

impl<'a> ByteRegion<'a> {
    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the region is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Read byte `i`, or `None` past the end.
    pub fn get(&self, i: usize) -> Option<u8> {
        if i >= self.len {
            return None;
        }
        let word = self.words[i / 4].load(Ordering::Relaxed);
        Some(word.to_le_bytes()[i % 4])
    }

    /// Write byte `i`. Returns `false` if `i` is past the end.
    pub fn set(&self, i: usize, value: u8) -> bool {
        if i >= self.len {
            return false;
        }
        let shift = (i % 4) * 8;
        let mask = 0xFFu32 << shift;
        let bits = u32::from(value) << shift;
        // The closure never returns None, so the update always succeeds.
        let _ = self.words[i / 4].fetch_update(Ordering::Relaxed, Ordering::Relaxed, |w| {
            Some((w & !mask) | bits)
        });
        true
    }

    /// Copy `data` into the region starting at `offset`.
    pub fn write_bytes(&self, offset: usize, data: &[u8]) -> Result<(), AllocError> {
        self.check_span(offset, data.len())?;
        for (i, &b) in data.iter().enumerate() {
            self.set(offset + i, b);
        }
        Ok(())
    }

    /// Copy bytes starting at `offset` into `out`.
    pub fn read_bytes(&self, offset: usize, out: &mut [u8]) -> Result<(), AllocError> {
        self.check_span(offset, out.len())?;
        for (i, slot) in out.iter_mut().enumerate() {
            // In bounds: checked above.
            *slot = self.get(offset + i).unwrap_or(0);
        }
        Ok(())
    }

    fn check_span(&self, offset: usize, len: usize) -> Result<(), AllocError> {
        match offset.checked_add(len) {
            Some(end) if end <= self.len => Ok(()),
            _ => Err(AllocError::Overflow {
                region: self.id.name(),
                requested: len,
                remaining: self.len.saturating_sub(offset),
            }),
        }
    }
}

// ── InputKeys ──────────────────────────────────────────────────────

/// Key state, one byte per key (non-zero = held).
///
/// Written by the input layer, read by workers during frame work.
#[derive(Clone, Copy)]
pub struct InputKeys<'a> {
    bytes: ByteRegion<'a>,
}

impl InputKeys<'_> {
    /// Number of keys tracked.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether no keys are tracked.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether `key` is held. Unknown keys read as released.
    pub fn is_down(&self, key: usize) -> bool {
        self.bytes.get(key).is_some_and(|b| b != 0)
    }

    /// Record `key` as held or released. Returns `false` for unknown keys.
    pub fn set(&self, key: usize, down: bool) -> bool {
        self.bytes.set(key, u8::from(down))
    }

    /// Release every key.
    pub fn clear(&self) {
        for key in 0..self.len() {
            self.bytes.set(key, 0);
        }
    }

    /// Indices of held keys, ascending.
    pub fn pressed(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len()).filter(|&k| self.is_down(k))
    }
}

// ── HrTimer ────────────────────────────────────────────────────────

/// 64-bit frame start timestamp in microseconds, stored as two words.
///
/// Only the coordinator writes it, before the "go" phase; workers read
/// it after waking, so the two halves are never observed mid-update.
#[derive(Clone, Copy)]
pub struct HrTimer<'a> {
    lo: &'a AtomicU32,
    hi: &'a AtomicU32,
}

impl HrTimer<'_> {
    /// Store a timestamp.
    pub fn store(&self, micros: u64) {
        self.lo.store(micros as u32, Ordering::Relaxed);
        self.hi.store((micros >> 32) as u32, Ordering::Relaxed);
    }

    /// Load the last stored timestamp.
    pub fn load(&self) -> u64 {
        let lo = u64::from(self.lo.load(Ordering::Relaxed));
        let hi = u64::from(self.hi.load(Ordering::Relaxed));
        (hi << 32) | lo
    }
}

// ── MemCounters ────────────────────────────────────────────────────

/// Per-worker heap usage in bytes.
#[derive(Clone, Copy)]
pub struct MemCounters<'a> {
    cells: &'a [AtomicU32],
}

impl MemCounters<'_> {
    /// Publish `worker`'s usage, saturating at `u32::MAX`.
    pub fn publish(&self, worker: WorkerIdx, bytes: usize) {
        if let Some(cell) = self.cells.get(worker.as_usize()) {
            let value = u32::try_from(bytes).unwrap_or(u32::MAX);
            cell.store(value, Ordering::Relaxed);
        }
    }

    /// Last usage published by `worker`.
    pub fn get(&self, worker: WorkerIdx) -> u32 {
        self.cells
            .get(worker.as_usize())
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }

    /// Sum over all workers.
    pub fn total(&self) -> u64 {
        self.cells
            .iter()
            .map(|c| u64::from(c.load(Ordering::Relaxed)))
            .sum()
    }
}
