//! Benchmark profiles for the weft frame engine.
//!
//! - [`reference_profile`]: the default 320x200 frame split over 4 workers
//! - [`stress_profile`]: 1280x720 over 16 workers
//! - [`ScanlineTask`]: a per-pixel frame task with a fixed cost

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::Arc;

use weft_core::{EngineConfig, WorkerIdx};
use weft_engine::{FrameContext, FrameTask, TaskFactory};

/// Default frame size and worker count.
pub fn reference_profile() -> EngineConfig {
    EngineConfig::default()
}

/// A large frame over many workers.
pub fn stress_profile() -> EngineConfig {
    EngineConfig {
        frame_width: 1280,
        frame_height: 720,
        num_workers: 16,
        max_memory_bytes: 1 << 26,
        ..EngineConfig::default()
    }
}

/// Writes a value derived from position and frame into every pixel of its rows.
pub struct ScanlineTask;

impl FrameTask for ScanlineTask {
    fn render(&mut self, frame: &mut FrameContext<'_>) {
        let fb = frame.frame_buffer();
        let seed = frame.frame_number() as u32;
        for y in frame.rows() {
            for x in 0..fb.width() {
                fb.set_pixel(x, y, x.wrapping_mul(31) ^ y.wrapping_mul(17) ^ seed);
            }
        }
    }
}

/// Factory building one [`ScanlineTask`] per worker.
pub fn scanline_factory() -> Arc<dyn TaskFactory> {
    Arc::new(|_: WorkerIdx| Box::new(ScanlineTask) as Box<dyn FrameTask>)
}
