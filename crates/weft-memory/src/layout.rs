//! Memory layout planning: configuration in, region table out.
//!
//! [`compute`] is a pure function. Regions are packed back to back in the
//! canonical [`RegionId::ALL`] order, each rounded up to [`REGION_ALIGN`],
//! so the table covers `[0, total_size)` exactly with no gaps or overlap.

use std::ops::Range;

use indexmap::IndexMap;
use serde::Serialize;
use weft_core::{ConfigError, LayoutConfig, WorkerIdx, BYTES_PER_PIXEL};

/// Alignment of every region offset and size, in bytes.
///
/// Matches the widest atomic word stored in the block (the 64-bit timer).
pub const REGION_ALIGN: usize = 8;

/// Bytes per 32-bit cell (sync, sleep, memory counter).
const CELL_BYTES: usize = 4;

/// Bytes in the high-resolution timer region.
const HR_TIMER_BYTES: usize = 8;

// ── RegionId ───────────────────────────────────────────────────────

/// Identifier of a region inside the shared block.
///
/// Declaration order is the canonical packing order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum RegionId {
    /// RGBA frame buffer, 4 bytes per pixel.
    FrameBuffer,
    /// One 32-bit handshake cell per worker.
    SyncArray,
    /// One 32-bit park cell per worker.
    SleepArray,
    /// Private heaps, one equal-sized sub-region per worker.
    WorkerHeaps,
    /// Heap shared by all workers.
    SharedHeap,
    /// Font glyph table.
    FontChars,
    /// String table.
    Strings,
    /// Image index table.
    ImagesIndex,
    /// Image pixel data.
    Images,
    /// One 32-bit heap usage counter per worker.
    WorkerMemCounters,
    /// One byte per tracked input key.
    InputKeys,
    /// 64-bit frame start timestamp in microseconds.
    HrTimer,
}

impl RegionId {
    /// Every region, in canonical packing order.
    pub const ALL: [RegionId; 12] = [
        RegionId::FrameBuffer,
        RegionId::SyncArray,
        RegionId::SleepArray,
        RegionId::WorkerHeaps,
        RegionId::SharedHeap,
        RegionId::FontChars,
        RegionId::Strings,
        RegionId::ImagesIndex,
        RegionId::Images,
        RegionId::WorkerMemCounters,
        RegionId::InputKeys,
        RegionId::HrTimer,
    ];

    /// Stable snake_case name, used in logs and errors.
    pub fn name(self) -> &'static str {
        match self {
            RegionId::FrameBuffer => "frame_buffer",
            RegionId::SyncArray => "sync_array",
            RegionId::SleepArray => "sleep_array",
            RegionId::WorkerHeaps => "worker_heaps",
            RegionId::SharedHeap => "shared_heap",
            RegionId::FontChars => "font_chars",
            RegionId::Strings => "strings",
            RegionId::ImagesIndex => "images_index",
            RegionId::Images => "images",
            RegionId::WorkerMemCounters => "worker_mem_counters",
            RegionId::InputKeys => "input_keys",
            RegionId::HrTimer => "hr_timer",
        }
    }
}

// ── MemoryRegion ───────────────────────────────────────────────────

/// A named, fixed-size, fixed-offset byte range inside the block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct MemoryRegion {
    /// Which region this is.
    pub id: RegionId,
    /// Byte offset from the start of the block. Multiple of [`REGION_ALIGN`].
    pub offset: usize,
    /// Size in bytes, already rounded up to [`REGION_ALIGN`].
    pub size: usize,
}

impl MemoryRegion {
    /// One past the last byte of the region.
    pub fn end(&self) -> usize {
        self.offset + self.size
    }

    /// The region as a byte range.
    pub fn range(&self) -> Range<usize> {
        self.offset..self.end()
    }

    /// Whether the region has zero bytes.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}

// ── MemoryLayout ───────────────────────────────────────────────────

/// The complete region table for one configuration.
///
/// Immutable once computed. Two layouts computed from equal
/// [`LayoutConfig`] values compare equal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MemoryLayout {
    regions: IndexMap<RegionId, MemoryRegion>,
    total_size: usize,
    num_workers: u32,
    worker_heap_stride: usize,
    frame_width: u32,
    frame_height: u32,
    input_keys: usize,
}

impl MemoryLayout {
    /// Look up a region. Every [`RegionId`] is present, possibly empty.
    pub fn region(&self, id: RegionId) -> MemoryRegion {
        // compute() inserts every id, so the fallback is unreachable.
        self.regions.get(&id).copied().unwrap_or(MemoryRegion {
            id,
            offset: self.total_size,
            size: 0,
        })
    }

    /// Iterate regions in canonical order.
    pub fn regions(&self) -> impl Iterator<Item = &MemoryRegion> {
        self.regions.values()
    }

    /// Size of the whole block in bytes.
    pub fn total_size(&self) -> usize {
        self.total_size
    }

    /// Worker count the layout was planned for.
    pub fn num_workers(&self) -> u32 {
        self.num_workers
    }

    /// Frame width in pixels.
    pub fn frame_width(&self) -> u32 {
        self.frame_width
    }

    /// Frame height in pixels.
    pub fn frame_height(&self) -> u32 {
        self.frame_height
    }

    /// Number of pixels in the frame buffer.
    pub fn frame_pixels(&self) -> usize {
        self.frame_width as usize * self.frame_height as usize
    }

    /// Number of input keys tracked.
    pub fn input_keys(&self) -> usize {
        self.input_keys
    }

    /// The private heap sub-region of `worker`, or `None` if out of range.
    pub fn worker_heap(&self, worker: WorkerIdx) -> Option<MemoryRegion> {
        if worker.0 >= self.num_workers {
            return None;
        }
        let heaps = self.region(RegionId::WorkerHeaps);
        Some(MemoryRegion {
            id: RegionId::WorkerHeaps,
            offset: heaps.offset + worker.as_usize() * self.worker_heap_stride,
            size: self.worker_heap_stride,
        })
    }
}

// ── compute ────────────────────────────────────────────────────────

/// Plan the region table for `config`.
///
/// Deterministic: equal configurations yield byte-identical tables.
///
/// # Errors
///
/// - [`ConfigError::NoWorkers`] if `num_workers` is zero.
/// - [`ConfigError::EmptyFrame`] if either frame dimension is zero.
/// - [`ConfigError::SizeOverflow`] if any region size or offset overflows.
/// - [`ConfigError::LayoutTooLarge`] if the block exceeds `max_memory_bytes`.
pub fn compute(config: &LayoutConfig) -> Result<MemoryLayout, ConfigError> {
    if config.num_workers == 0 {
        return Err(ConfigError::NoWorkers);
    }
    if config.frame_width == 0 || config.frame_height == 0 {
        return Err(ConfigError::EmptyFrame {
            width: config.frame_width,
            height: config.frame_height,
        });
    }

    let workers = config.num_workers as usize;
    let worker_heap_stride = align_up(config.worker_heap_size_bytes)
        .ok_or(ConfigError::SizeOverflow {
            region: RegionId::WorkerHeaps.name(),
        })?;

    let mut regions = IndexMap::with_capacity(RegionId::ALL.len());
    let mut cursor = 0usize;
    for id in RegionId::ALL {
        let raw = raw_size(id, config, workers, worker_heap_stride)
            .ok_or(ConfigError::SizeOverflow { region: id.name() })?;
        let size = align_up(raw).ok_or(ConfigError::SizeOverflow { region: id.name() })?;
        let region = MemoryRegion {
            id,
            offset: cursor,
            size,
        };
        cursor = cursor
            .checked_add(size)
            .ok_or(ConfigError::SizeOverflow { region: id.name() })?;
        tracing::debug!(
            region = id.name(),
            offset = region.offset,
            size = region.size,
            "planned region"
        );
        regions.insert(id, region);
    }

    if cursor > config.max_memory_bytes {
        return Err(ConfigError::LayoutTooLarge {
            required: cursor,
            maximum: config.max_memory_bytes,
        });
    }

    tracing::info!(
        total_size = cursor,
        num_workers = config.num_workers,
        "memory layout computed"
    );

    Ok(MemoryLayout {
        regions,
        total_size: cursor,
        num_workers: config.num_workers,
        worker_heap_stride,
        frame_width: config.frame_width,
        frame_height: config.frame_height,
        input_keys: config.input_keys,
    })
}

fn raw_size(
    id: RegionId,
    config: &LayoutConfig,
    workers: usize,
    worker_heap_stride: usize,
) -> Option<usize> {
    match id {
        RegionId::FrameBuffer => (config.frame_width as usize)
            .checked_mul(config.frame_height as usize)?
            .checked_mul(BYTES_PER_PIXEL),
        RegionId::SyncArray | RegionId::SleepArray | RegionId::WorkerMemCounters => {
            workers.checked_mul(CELL_BYTES)
        }
        RegionId::WorkerHeaps => workers.checked_mul(worker_heap_stride),
        RegionId::SharedHeap => Some(config.shared_heap_size_bytes),
        RegionId::FontChars => Some(config.font_chars_bytes),
        RegionId::Strings => Some(config.strings_bytes),
        RegionId::ImagesIndex => Some(config.images_index_bytes),
        RegionId::Images => Some(config.images_bytes),
        RegionId::InputKeys => Some(config.input_keys),
        RegionId::HrTimer => Some(HR_TIMER_BYTES),
    }
}

/// Round `n` up to [`REGION_ALIGN`], or `None` on overflow.
pub(crate) fn align_up(n: usize) -> Option<usize> {
    align_up_to(n, REGION_ALIGN)
}

/// Round `n` up to a power-of-two `align`, or `None` on overflow.
pub(crate) fn align_up_to(n: usize, align: usize) -> Option<usize> {
    debug_assert!(align.is_power_of_two());
    let mask = align - 1;
    n.checked_add(mask).map(|v| v & !mask)
}
