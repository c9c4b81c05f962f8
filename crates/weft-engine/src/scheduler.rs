//! The fixed-timestep frame scheduler.
//!
//! One [`FrameScheduler::tick`] per display callback:
//!
//! 1. measure the time since the previous tick and feed it to the
//!    [`FrameClock`] (clamp, smooth, accumulate, resync, drain updates);
//! 2. store the frame start time, signal "go" to every aux worker and
//!    render the coordinator's own share inline;
//! 3. wait for every issued worker's "done", copy the frame buffer into
//!    the reusable [`FrameImage`] and hand it to the [`PresentSink`];
//! 4. every `stats_period_ms` of wall time, push FPS / UPS / UFPS / MEM
//!    samples into the [`StatsAggregator`] and emit an [`EngineEvent`].
//!
//! Rendering happens once per tick whatever the number of updates
//! drained. A worker still busy from a stalled frame gets no "go" and
//! is not waited on; its rows would be stale, so that frame is not
//! presented. A failed frame is logged and skipped; the loop never stops
//! on its own.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use serde::Serialize;
use weft_core::{EngineConfig, PresentError};
use weft_memory::{MemoryLayout, SharedBlock};
use weft_sync::SyncArray;

use crate::clock::{ClockStep, FrameClock, TimeSource};
use crate::metrics::{FrameMetrics, SchedulerCounters};
use crate::present::{FrameImage, PresentSink};
use crate::ring::RollingWindow;
use crate::stats::{StatsAggregator, StatsName, StatsValues};
use crate::worker::WorkerState;

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// Outward messages from a running engine.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum EngineEvent {
    /// Periodic statistics snapshot.
    Stats(StatsValues),
}

/// Scheduler lifecycle. The first tick moves it to `Running`; teardown
/// belongs to the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerState {
    /// No tick has run yet.
    Uninitialized,
    /// Ticking.
    Running,
}

/// Drives the barrier and presents frames. Owned by the coordinator.
pub struct FrameScheduler {
    state: SchedulerState,
    layout: Arc<MemoryLayout>,
    block: Arc<SharedBlock>,
    coordinator: WorkerState,
    clock: FrameClock,
    time: Box<dyn TimeSource>,
    image: FrameImage,
    frame_times: RollingWindow,
    stats: StatsAggregator,
    stats_period_ms: f64,
    stats_time_acc: f64,
    stats_elapsed_ms: f64,
    last_tick_ms: f64,
    last_stats_ms: f64,
    barrier_timeout: Option<Duration>,
    events: Option<Sender<EngineEvent>>,
    counters: SchedulerCounters,
    last: FrameMetrics,
}

impl FrameScheduler {
    pub(crate) fn new(
        config: &EngineConfig,
        layout: Arc<MemoryLayout>,
        block: Arc<SharedBlock>,
        coordinator: WorkerState,
        time: Box<dyn TimeSource>,
        events: Option<Sender<EngineEvent>>,
    ) -> Self {
        let image = FrameImage::new(layout.frame_width(), layout.frame_height());
        Self {
            state: SchedulerState::Uninitialized,
            layout,
            block,
            coordinator,
            clock: FrameClock::new(config),
            time,
            image,
            frame_times: RollingWindow::new(config.frame_time_samples),
            stats: StatsAggregator::new(config.stats_samples),
            stats_period_ms: config.stats_period_ms,
            stats_time_acc: 0.0,
            stats_elapsed_ms: 0.0,
            last_tick_ms: 0.0,
            last_stats_ms: 0.0,
            barrier_timeout: config.barrier_timeout_ms.map(Duration::from_millis),
            events,
            counters: SchedulerCounters::default(),
            last: FrameMetrics::default(),
        }
    }

    /// Run one tick at `now_ms` (from the scheduler's time base).
    ///
    /// The first tick only records its time and renders; the first delta
    /// reaches the clock on the second tick.
    pub fn tick(&mut self, now_ms: f64, sink: &mut dyn PresentSink) -> FrameMetrics {
        let first = self.state == SchedulerState::Uninitialized;
        if first {
            self.last_tick_ms = now_ms;
            self.last_stats_ms = now_ms;
            self.state = SchedulerState::Running;
            tracing::info!(
                update_period_ms = self.clock.update_period_ms(),
                workers = self.layout.num_workers(),
                "frame scheduler started"
            );
        }

        let delta_ms = now_ms - self.last_tick_ms;
        self.last_tick_ms = now_ms;
        self.update_stats(delta_ms, now_ms);

        let step = if first {
            ClockStep {
                smoothed_ms: 0.0,
                updates: 0,
                resynced: false,
            }
        } else {
            self.clock.advance(delta_ms)
        };
        let mut metrics = FrameMetrics {
            delta_ms,
            smoothed_ms: step.smoothed_ms,
            updates: step.updates,
            resynced: step.resynced,
            ..FrameMetrics::default()
        };
        self.render(&mut metrics, sink);

        self.counters.ticks += 1;
        self.counters.updates += u64::from(step.updates);
        self.counters.resyncs += u64::from(step.resynced);
        self.last = metrics.clone();
        metrics
    }

    /// Run one tick at the current time of the scheduler's [`TimeSource`].
    pub fn tick_now(&mut self, sink: &mut dyn PresentSink) -> FrameMetrics {
        let now = self.time.now_ms();
        self.tick(now, sink)
    }

    fn render(&mut self, metrics: &mut FrameMetrics, sink: &mut dyn PresentSink) {
        let frame_start_ms = self.time.now_ms();
        let go_at = Instant::now();
        let view = self.block.view(&self.layout);
        view.hr_timer().store((frame_start_ms.max(0.0) * 1000.0) as u64);

        let sync = SyncArray::new(view.sync_cells());
        let skipped = sync.go_all();
        if !skipped.is_empty() {
            tracing::warn!(?skipped, "workers still busy from an earlier frame, not re-issued");
        }
        metrics.skipped_workers = skipped.len() as u32;

        let own = self.coordinator.render_frame();
        let waited = sync.wait_issued_done(&skipped, self.barrier_timeout);
        metrics.barrier_us = go_at.elapsed().as_micros() as u64;

        let image = &mut self.image;
        let outcome = own
            .map_err(|reason| PresentError::ComposePanicked { reason })
            .and_then(|()| waited.map_err(PresentError::from))
            .and_then(|()| match skipped.len() {
                0 => Ok(()),
                n => Err(PresentError::Partial { skipped: n as u32 }),
            })
            .and_then(|()| {
                view.frame_buffer().copy_into(image.pixels_mut());
                sink.present(image)
            });

        match outcome {
            Ok(()) => {
                metrics.presented = true;
                self.counters.frames_presented += 1;
            }
            Err(PresentError::Stalled(stall)) => {
                tracing::error!(error = %stall, "barrier wait timed out, frame skipped");
                self.counters.stalls += 1;
                self.counters.frames_skipped += 1;
            }
            Err(PresentError::Partial { skipped }) => {
                tracing::warn!(skipped, "frame incomplete, skipped");
                self.counters.partial_frames += 1;
                self.counters.frames_skipped += 1;
            }
            Err(e) => {
                tracing::error!(error = %e, "frame presentation failed, frame skipped");
                self.counters.frames_skipped += 1;
            }
        }

        let render_ms = self.time.now_ms() - frame_start_ms;
        self.frame_times.push(render_ms);
        metrics.render_us = go_at.elapsed().as_micros() as u64;
    }

    fn update_stats(&mut self, delta_ms: f64, now_ms: f64) {
        if delta_ms.is_finite() {
            self.stats_time_acc += delta_ms;
        }
        if self.stats_time_acc < self.stats_period_ms {
            return;
        }
        self.stats_time_acc %= self.stats_period_ms;

        let elapsed = now_ms - self.last_stats_ms;
        self.last_stats_ms = now_ms;
        self.stats_elapsed_ms += elapsed;

        if self.stats_elapsed_ms > 0.0 {
            let per_sec = 1000.0 / self.stats_elapsed_ms;
            self.stats
                .record(StatsName::Fps, self.counters.frames_presented as f64 * per_sec);
            self.stats
                .record(StatsName::Ups, self.clock.update_count() as f64 * per_sec);
        }
        if let Some(avg) = self.frame_times.average().filter(|&avg| avg > 0.0) {
            self.stats.record(StatsName::Ufps, 1000.0 / avg);
        }
        let mem = self.block.view(&self.layout).mem_counters().total();
        self.stats.record(StatsName::Mem, mem as f64 / BYTES_PER_MIB);

        let values = self.stats.values();
        self.counters.stats_emitted += 1;
        tracing::debug!(?values, "stats emitted");
        if let Some(tx) = &self.events {
            if tx.try_send(EngineEvent::Stats(values)).is_err() {
                tracing::debug!("stats event dropped, receiver full or gone");
            }
        }
    }

    /// Discard accumulated time on the next tick.
    pub fn request_resync(&mut self) {
        self.clock.request_resync();
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Metrics of the most recent tick.
    pub fn last_metrics(&self) -> &FrameMetrics {
        &self.last
    }

    /// Totals since the first tick.
    pub fn counters(&self) -> &SchedulerCounters {
        &self.counters
    }

    /// Current rolling-average statistics.
    pub fn stats(&self) -> StatsValues {
        self.stats.values()
    }

    /// The fixed-timestep accumulator.
    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    /// The most recently composed image.
    pub fn image(&self) -> &FrameImage {
        &self.image
    }

    /// Current time of the scheduler's time base, in ms.
    pub fn now_ms(&self) -> f64 {
        self.time.now_ms()
    }
}
