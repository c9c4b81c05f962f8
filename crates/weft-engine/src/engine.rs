//! Engine lifecycle: build, run, tick, shut down.
//!
//! ```text
//! EngineConfig ─validate─▶ compute layout ─▶ SharedBlock::new
//!        ─▶ WorkerPool::spawn (INIT / READY) ─▶ coordinator init
//!        ─▶ Engine::run (RUN) ─▶ tick … tick ─▶ Engine::shutdown (EXIT + join)
//! ```
//!
//! There is no process-wide state: everything a component needs is
//! owned by the [`Engine`] value and handed down explicitly.

use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::Receiver;
use weft_core::{EngineConfig, WorkerIdx};
use weft_memory::{compute, BlockView, InputKeys, MemoryLayout, RegionId, SharedBlock};
use weft_sync::SleepArray;

use crate::clock::{MonotonicClock, TimeSource};
use crate::error::EngineError;
use crate::metrics::{FrameMetrics, SchedulerCounters};
use crate::present::PresentSink;
use crate::scheduler::{EngineEvent, FrameScheduler};
use crate::stats::StatsValues;
use crate::task::TaskFactory;
use crate::worker::{WorkerPool, WorkerState};

/// Capacity of the outward event channel. Stats beyond it are dropped.
const EVENT_CHANNEL_CAPACITY: usize = 64;

// ── ShutdownReport ───────────────────────────────────────────────

/// Report from [`Engine::shutdown`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Time spent in the shutdown sequence.
    pub total_ms: u64,
    /// Aux worker threads joined.
    pub workers_joined: usize,
    /// Ticks performed over the engine's lifetime.
    pub ticks: u64,
    /// Frames presented over the engine's lifetime.
    pub frames_presented: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EngineState {
    Ready,
    Running,
    Shutdown,
}

impl EngineState {
    fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Shutdown => "shut down",
        }
    }
}

// ── Engine ───────────────────────────────────────────────────────

/// One shared block, its worker threads and the scheduler driving them.
pub struct Engine {
    config: EngineConfig,
    layout: Arc<MemoryLayout>,
    block: Arc<SharedBlock>,
    pool: WorkerPool,
    scheduler: FrameScheduler,
    events: Receiver<EngineEvent>,
    state: EngineState,
}

impl Engine {
    /// Build an engine timed by the monotonic clock.
    ///
    /// # Errors
    ///
    /// [`EngineError::Config`] if the configuration is invalid, the
    /// layout does not fit, a thread cannot be spawned, or any worker
    /// (including the coordinator's share) fails to initialise.
    pub fn build(config: EngineConfig, factory: Arc<dyn TaskFactory>) -> Result<Self, EngineError> {
        Self::build_with_clock(config, factory, Box::new(MonotonicClock::new()))
    }

    /// Build an engine with an explicit time source.
    pub fn build_with_clock(
        config: EngineConfig,
        factory: Arc<dyn TaskFactory>,
        time: Box<dyn TimeSource>,
    ) -> Result<Self, EngineError> {
        let started = Instant::now();
        config.validate()?;
        let layout = Arc::new(compute(&config.layout_config())?);
        let block = Arc::new(SharedBlock::new(&layout));

        let pool = WorkerPool::spawn(&config, Arc::clone(&layout), Arc::clone(&block), Arc::clone(&factory))?;
        // On failure the pool is dropped here, which releases and joins it.
        let coordinator =
            WorkerState::init(WorkerIdx::COORDINATOR, &config, Arc::clone(&block), factory.as_ref())?;

        let (events_tx, events) = crossbeam_channel::bounded(EVENT_CHANNEL_CAPACITY);
        let scheduler = FrameScheduler::new(
            &config,
            Arc::clone(&layout),
            Arc::clone(&block),
            coordinator,
            time,
            Some(events_tx),
        );

        tracing::info!(
            workers = config.num_workers,
            block_bytes = layout.total_size(),
            build_ms = started.elapsed().as_millis() as u64,
            "engine built"
        );
        Ok(Self {
            config,
            layout,
            block,
            pool,
            scheduler,
            events,
            state: EngineState::Ready,
        })
    }

    /// Send RUN to every aux worker. Idempotent while running.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotRunning`] after shutdown.
    pub fn run(&mut self) -> Result<(), EngineError> {
        match self.state {
            EngineState::Shutdown => Err(self.not_running()),
            EngineState::Running => Ok(()),
            EngineState::Ready => {
                self.pool.run();
                self.state = EngineState::Running;
                Ok(())
            }
        }
    }

    /// Run one tick at `now_ms` on the engine's time base.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotRunning`] before [`run`](Self::run) or after
    /// shutdown.
    pub fn tick(&mut self, now_ms: f64, sink: &mut dyn PresentSink) -> Result<FrameMetrics, EngineError> {
        self.ensure_running()?;
        Ok(self.scheduler.tick(now_ms, sink))
    }

    /// Run one tick at the current time of the engine's time source.
    pub fn tick_now(&mut self, sink: &mut dyn PresentSink) -> Result<FrameMetrics, EngineError> {
        self.ensure_running()?;
        Ok(self.scheduler.tick_now(sink))
    }

    fn ensure_running(&self) -> Result<(), EngineError> {
        if self.state == EngineState::Running {
            Ok(())
        } else {
            Err(self.not_running())
        }
    }

    fn not_running(&self) -> EngineError {
        EngineError::NotRunning {
            state: self.state.as_str(),
        }
    }

    /// Discard accumulated time on the next tick.
    pub fn request_resync(&mut self) {
        self.scheduler.request_resync();
    }

    /// Copy `data` into an asset table at `offset`.
    ///
    /// Meant for bootstrapping before [`run`](Self::run); workers read
    /// the tables during frame work.
    ///
    /// # Errors
    ///
    /// [`EngineError::Alloc`] if the data runs past the region.
    pub fn load_asset(&self, id: RegionId, offset: usize, data: &[u8]) -> Result<(), EngineError> {
        self.view().bytes(id).write_bytes(offset, data)?;
        tracing::debug!(region = id.name(), offset, len = data.len(), "asset loaded");
        Ok(())
    }

    /// Key state shared with the workers. The host is the only writer.
    pub fn input_keys(&self) -> InputKeys<'_> {
        self.view().input_keys()
    }

    /// Cut short every worker sleeping on its sleep cell.
    pub fn wake_sleepers(&self) {
        SleepArray::new(self.view().sleep_cells()).wake_all();
    }

    /// Typed access to the whole block.
    pub fn view(&self) -> BlockView<'_> {
        self.block.view(&self.layout)
    }

    /// The computed memory layout.
    pub fn layout(&self) -> &MemoryLayout {
        &self.layout
    }

    /// The configuration the engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Receiver for periodic [`EngineEvent`]s. Clones share one queue.
    pub fn events(&self) -> Receiver<EngineEvent> {
        self.events.clone()
    }

    /// Current rolling-average statistics.
    pub fn stats(&self) -> StatsValues {
        self.scheduler.stats()
    }

    /// Scheduler totals.
    pub fn counters(&self) -> &SchedulerCounters {
        self.scheduler.counters()
    }

    /// Metrics of the most recent tick.
    pub fn last_metrics(&self) -> &FrameMetrics {
        self.scheduler.last_metrics()
    }

    /// The frame scheduler.
    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    /// Whether [`run`](Self::run) has been called and shutdown has not.
    pub fn is_running(&self) -> bool {
        self.state == EngineState::Running
    }

    /// Release every worker with EXIT and join the threads. Idempotent.
    pub fn shutdown(&mut self) -> ShutdownReport {
        if self.state == EngineState::Shutdown {
            return ShutdownReport::default();
        }
        let start = Instant::now();
        self.state = EngineState::Shutdown;
        self.wake_sleepers();
        let workers_joined = self.pool.shutdown();
        let counters = self.scheduler.counters();
        let report = ShutdownReport {
            total_ms: start.elapsed().as_millis() as u64,
            workers_joined,
            ticks: counters.ticks,
            frames_presented: counters.frames_presented,
        };
        tracing::info!(
            workers_joined,
            ticks = report.ticks,
            total_ms = report.total_ms,
            "engine shut down"
        );
        report
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// Compile-time assertion: Engine is Send (movable to a display thread).
const _: fn() = || {
    fn assert_send<T: Send>() {}
    assert_send::<Engine>();
};
