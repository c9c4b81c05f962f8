//! The unit of frame work each worker performs.
//!
//! The engine does not know how a frame is drawn. Each worker owns one
//! [`FrameTask`], built by a [`TaskFactory`], and calls it once per frame
//! with a [`FrameContext`] describing that worker's share.

use std::ops::Range;

use weft_core::{AllocError, WorkerIdx};
use weft_memory::{BlockView, ByteRegion, FrameBuffer, InputKeys, RegionHeap, RegionId};
use weft_sync::SleepArray;

/// Per-worker frame work.
pub trait FrameTask: Send {
    /// Called once on the worker's thread before the first frame.
    ///
    /// Long-lived allocations (arenas, lookup tables) belong here.
    fn init(&mut self, ctx: &mut InitContext<'_>) -> Result<(), AllocError> {
        let _ = ctx;
        Ok(())
    }

    /// Produce this worker's share of one frame.
    ///
    /// Only the rows in [`FrameContext::rows`] may be written.
    fn render(&mut self, frame: &mut FrameContext<'_>);
}

/// Builds one [`FrameTask`] per worker.
pub trait TaskFactory: Send + Sync {
    /// Create the task for `worker`.
    fn create(&self, worker: WorkerIdx) -> Box<dyn FrameTask>;
}

impl<F> TaskFactory for F
where
    F: Fn(WorkerIdx) -> Box<dyn FrameTask> + Send + Sync,
{
    fn create(&self, worker: WorkerIdx) -> Box<dyn FrameTask> {
        self(worker)
    }
}

/// What a task sees during [`FrameTask::init`].
pub struct InitContext<'a> {
    pub(crate) worker: WorkerIdx,
    pub(crate) num_workers: u32,
    pub(crate) heap: &'a mut RegionHeap,
    pub(crate) view: BlockView<'a>,
}

impl<'a> InitContext<'a> {
    /// This worker's index.
    pub fn worker(&self) -> WorkerIdx {
        self.worker
    }

    /// Total workers, including the coordinator's share.
    pub fn num_workers(&self) -> u32 {
        self.num_workers
    }

    /// This worker's private heap.
    pub fn heap(&mut self) -> &mut RegionHeap {
        self.heap
    }

    /// Read access to an asset table.
    pub fn asset(&self, id: RegionId) -> ByteRegion<'a> {
        self.view.bytes(id)
    }
}

/// What a task sees during [`FrameTask::render`].
pub struct FrameContext<'a> {
    pub(crate) worker: WorkerIdx,
    pub(crate) num_workers: u32,
    pub(crate) frame: u64,
    pub(crate) rows: Range<u32>,
    pub(crate) heap: &'a mut RegionHeap,
    pub(crate) view: BlockView<'a>,
}

impl<'a> FrameContext<'a> {
    /// This worker's index.
    pub fn worker(&self) -> WorkerIdx {
        self.worker
    }

    /// Total workers, including the coordinator's share.
    pub fn num_workers(&self) -> u32 {
        self.num_workers
    }

    /// Frames this worker has rendered before this one.
    pub fn frame_number(&self) -> u64 {
        self.frame
    }

    /// Frame-buffer rows assigned to this worker.
    pub fn rows(&self) -> Range<u32> {
        self.rows.clone()
    }

    /// The shared frame buffer.
    pub fn frame_buffer(&self) -> FrameBuffer<'a> {
        self.view.frame_buffer()
    }

    /// Current key state.
    pub fn input_keys(&self) -> InputKeys<'a> {
        self.view.input_keys()
    }

    /// Frame start time in microseconds, written by the coordinator.
    pub fn frame_start_us(&self) -> u64 {
        self.view.hr_timer().load()
    }

    /// This worker's private heap.
    pub fn heap(&mut self) -> &mut RegionHeap {
        self.heap
    }

    /// Read access to an asset table.
    pub fn asset(&self, id: RegionId) -> ByteRegion<'a> {
        self.view.bytes(id)
    }

    /// The per-worker park cells.
    pub fn sleep_cells(&self) -> SleepArray<'a> {
        SleepArray::new(self.view.sleep_cells())
    }
}

/// A task that fills its rows with one colour. Useful as a placeholder.
#[derive(Clone, Copy, Debug)]
pub struct FillTask {
    /// Pixel value written to every assigned row.
    pub colour: u32,
}

impl FrameTask for FillTask {
    fn render(&mut self, frame: &mut FrameContext<'_>) {
        frame.frame_buffer().fill_rows(frame.rows(), self.colour);
    }
}
