//! Reusable frame-task fixtures.
//!
//! - [`SentinelTask`] fills its rows with a value encoding worker and
//!   frame, optionally after a random delay.
//! - [`StallingTask`] blocks for a fixed time on one chosen frame.
//! - [`JitterSource`] produces deterministic pseudo-random delays and
//!   tick deltas.

use std::time::Duration;

use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use weft_core::WorkerIdx;
use weft_engine::{FrameContext, FrameTask};

/// Pixel value written by worker `worker` during frame `frame`.
///
/// Never zero, so an unwritten row is always detectable.
pub fn sentinel(worker: WorkerIdx, frame: u64) -> u32 {
    ((worker.0 + 1) << 24) | (frame as u32 & 0x00FF_FFFF)
}

/// Seeded source of random delays and tick deltas.
#[derive(Clone, Debug)]
pub struct JitterSource {
    rng: ChaCha8Rng,
}

impl JitterSource {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// A delay in `[0, max)`. Zero when `max` is zero.
    pub fn delay(&mut self, max: Duration) -> Duration {
        let max_us = max.as_micros() as u64;
        if max_us == 0 {
            return Duration::ZERO;
        }
        Duration::from_micros(self.rng.next_u64() % max_us)
    }

    /// `n` tick deltas in `[base_ms - spread_ms, base_ms + spread_ms]`.
    pub fn deltas_ms(&mut self, base_ms: f64, spread_ms: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|_| {
                let unit = self.rng.next_u32() as f64 / u32::MAX as f64;
                base_ms + spread_ms * (2.0 * unit - 1.0)
            })
            .collect()
    }
}

/// Writes [`sentinel`] into every assigned row.
pub struct SentinelTask {
    jitter: Option<(JitterSource, Duration)>,
}

impl SentinelTask {
    pub fn new() -> Self {
        Self { jitter: None }
    }

    /// Sleep a random time below `max` before writing, seeded per worker.
    pub fn with_jitter(worker: WorkerIdx, seed: u64, max: Duration) -> Self {
        Self {
            jitter: Some((JitterSource::new(seed ^ u64::from(worker.0)), max)),
        }
    }
}

impl Default for SentinelTask {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameTask for SentinelTask {
    fn render(&mut self, frame: &mut FrameContext<'_>) {
        if let Some((jitter, max)) = &mut self.jitter {
            std::thread::sleep(jitter.delay(*max));
        }
        let value = sentinel(frame.worker(), frame.frame_number());
        frame.frame_buffer().fill_rows(frame.rows(), value);
    }
}

/// Fills its rows with `colour`, except on frame `stall_on` where it
/// first blocks for `duration`.
pub struct StallingTask {
    pub colour: u32,
    pub stall_on: u64,
    pub duration: Duration,
}

impl FrameTask for StallingTask {
    fn render(&mut self, frame: &mut FrameContext<'_>) {
        if frame.frame_number() == self.stall_on {
            std::thread::sleep(self.duration);
        }
        frame.frame_buffer().fill_rows(frame.rows(), self.colour);
    }
}
