//! Test utilities for weft development.
//!
//! Provides a hand-driven [`ManualClock`], recording and failing
//! presentation sinks, small engine configurations, and the frame-task
//! fixtures in [`fixtures`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use weft_core::{EngineConfig, PresentError};
use weft_engine::{FrameImage, PresentSink, TimeSource};

pub use fixtures::{sentinel, JitterSource, SentinelTask, StallingTask};

/// A [`TimeSource`] that only moves when told to.
///
/// Clones share the same time, so a test can keep one clone and hand
/// the other to the engine.
#[derive(Clone, Debug, Default)]
pub struct ManualClock(Arc<AtomicU64>);

impl ManualClock {
    pub fn new(start_ms: f64) -> Self {
        Self(Arc::new(AtomicU64::new(start_ms.to_bits())))
    }

    pub fn set(&self, ms: f64) {
        self.0.store(ms.to_bits(), Ordering::SeqCst);
    }

    pub fn advance(&self, ms: f64) -> f64 {
        let now = self.now_ms() + ms;
        self.set(now);
        now
    }
}

impl TimeSource for ManualClock {
    fn now_ms(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::SeqCst))
    }
}

/// Keeps a copy of every presented frame.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub frames: Vec<FrameImage>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&FrameImage> {
        self.frames.last()
    }
}

impl PresentSink for RecordingSink {
    fn present(&mut self, frame: &FrameImage) -> Result<(), PresentError> {
        self.frames.push(frame.clone());
        Ok(())
    }
}

/// Rejects the calls whose (zero-based) index is in `fail_on`.
#[derive(Debug, Default)]
pub struct FailingSink {
    fail_on: BTreeSet<u64>,
    pub calls: u64,
    pub accepted: u64,
}

impl FailingSink {
    pub fn new(fail_on: impl IntoIterator<Item = u64>) -> Self {
        Self {
            fail_on: fail_on.into_iter().collect(),
            calls: 0,
            accepted: 0,
        }
    }
}

impl PresentSink for FailingSink {
    fn present(&mut self, _frame: &FrameImage) -> Result<(), PresentError> {
        let call = self.calls;
        self.calls += 1;
        if self.fail_on.contains(&call) {
            return Err(PresentError::Sink {
                reason: format!("injected failure on call {call}"),
            });
        }
        self.accepted += 1;
        Ok(())
    }
}

/// A small configuration: `width × height` frame, tiny heaps, no assets.
pub fn test_config(num_workers: u32, width: u32, height: u32) -> EngineConfig {
    EngineConfig {
        frame_width: width,
        frame_height: height,
        num_workers,
        worker_heap_size_bytes: 4096,
        shared_heap_size_bytes: 0,
        input_keys: 16,
        ..EngineConfig::default()
    }
}
