//! Error types for the weft frame engine.
//!
//! Organized by subsystem: configuration and layout (fatal at init),
//! heap and arena allocation, barrier liveness, and frame presentation.

use thiserror::Error;

use crate::id::WorkerIdx;

/// Invalid engine configuration or startup failure.
///
/// Raised before any worker runs; startup is aborted.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The worker count is zero.
    #[error("num_workers must be at least 1")]
    NoWorkers,
    /// The frame has zero width or height.
    #[error("frame dimensions must be non-zero, got {width}x{height}")]
    EmptyFrame {
        /// Configured frame width in pixels.
        width: u32,
        /// Configured frame height in pixels.
        height: u32,
    },
    /// A rate or period is NaN, infinite, zero, or negative.
    #[error("{name} must be finite and positive, got {value}")]
    InvalidRate {
        /// Name of the offending setting.
        name: &'static str,
        /// The invalid value.
        value: f64,
    },
    /// A ring-buffer length is zero.
    #[error("{name} must be at least 1")]
    ZeroWindow {
        /// Name of the offending setting.
        name: &'static str,
    },
    /// A region size computation overflowed.
    #[error("size of region {region} overflows")]
    SizeOverflow {
        /// The region whose size could not be represented.
        region: &'static str,
    },
    /// The planned block exceeds the configured maximum.
    #[error("memory layout needs {required} bytes, maximum is {maximum}")]
    LayoutTooLarge {
        /// Total bytes the layout requires.
        required: usize,
        /// Configured `max_memory_bytes`.
        maximum: usize,
    },
    /// A worker recomputed a layout that disagrees with the block it was handed.
    #[error("worker {worker}: layout needs {expected} bytes but block holds {actual}")]
    LayoutMismatch {
        /// The worker that detected the mismatch.
        worker: WorkerIdx,
        /// Bytes required by the recomputed layout.
        expected: usize,
        /// Bytes in the shared block.
        actual: usize,
    },
    /// A worker failed to initialise.
    #[error("worker {worker} failed to initialise: {reason}")]
    WorkerInit {
        /// The failing worker.
        worker: WorkerIdx,
        /// Human-readable cause.
        reason: String,
    },
    /// A worker thread could not be spawned.
    #[error("thread spawn failed: {reason}")]
    ThreadSpawnFailed {
        /// Description of which thread failed.
        reason: String,
    },
    /// The configuration file could not be read.
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    /// The configuration file is not valid TOML for [`EngineConfig`](crate::EngineConfig).
    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Allocation failures in region heaps and arenas.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AllocError {
    /// The request would run past the end of the heap region.
    #[error("heap region {region} overflow: requested {requested} bytes, {remaining} remaining")]
    Overflow {
        /// Name of the heap region.
        region: &'static str,
        /// Bytes requested, including alignment padding.
        requested: usize,
        /// Bytes still available in the region.
        remaining: usize,
    },
    /// Arena parameters cannot form a block.
    #[error("invalid arena parameters: {reason}")]
    InvalidArena {
        /// Which parameter was rejected.
        reason: String,
    },
}

/// A worker did not complete its barrier phase in time.
///
/// Only produced when a barrier deadline is configured; without one the
/// coordinator waits indefinitely.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum StallError {
    /// The worker's sync cell stayed at "work assigned" past the deadline.
    #[error("worker {worker} stalled: no completion after {waited_ms} ms")]
    LivenessStall {
        /// The worker that never signalled done.
        worker: WorkerIdx,
        /// How long the coordinator waited.
        waited_ms: u64,
    },
}

/// Composing or handing off a frame failed.
///
/// Caught per tick by the scheduler; the frame is skipped and the loop
/// continues.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PresentError {
    /// The presentation sink rejected the frame.
    #[error("presentation sink failed: {reason}")]
    Sink {
        /// Human-readable description from the sink.
        reason: String,
    },
    /// The composed image does not match the sink's surface.
    #[error("frame is {actual_width}x{actual_height}, surface expects {expected_width}x{expected_height}")]
    SizeMismatch {
        /// Surface width.
        expected_width: u32,
        /// Surface height.
        expected_height: u32,
        /// Frame width.
        actual_width: u32,
        /// Frame height.
        actual_height: u32,
    },
    /// The coordinator's own share of the frame work panicked.
    #[error("frame composition panicked: {reason}")]
    ComposePanicked {
        /// Panic payload, if it was a string.
        reason: String,
    },
    /// The barrier did not complete, so the frame buffer is incomplete.
    #[error(transparent)]
    Stalled(#[from] StallError),
    /// Some workers were still busy from an earlier frame and got no work,
    /// so their rows are stale.
    #[error("{skipped} worker(s) still busy from an earlier frame, frame incomplete")]
    Partial {
        /// Workers left out of this frame.
        skipped: u32,
    },
}
