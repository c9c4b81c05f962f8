//! Worker threads and the INIT / READY / RUN orchestration protocol.
//!
//! Each aux worker runs on its own thread with a private command
//! channel. Startup is a two-step handshake:
//!
//! 1. [`WorkerCommand::Init`] carries the configuration and the shared
//!    block. The worker recomputes the layout itself, checks it against
//!    the block, builds its task and replies [`WorkerReply::Ready`] (or
//!    [`WorkerReply::InitFailed`]).
//! 2. [`WorkerCommand::Run`] moves the worker into its frame loop, parked
//!    on its sync cell between frames.
//!
//! Teardown stores `EXIT` into every sync cell and joins the threads.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};
use weft_core::{task_range, ConfigError, EngineConfig, WorkerIdx};
use weft_memory::{compute, MemoryLayout, RegionHeap, SharedBlock};
use weft_sync::{Signal, SyncArray};

use crate::task::{FrameContext, FrameTask, InitContext, TaskFactory};

// ── Messages ───────────────────────────────────────────────────────

/// Payload of [`WorkerCommand::Init`].
#[derive(Clone)]
pub struct WorkerInit {
    /// The engine configuration. The worker derives its layout from it.
    pub config: EngineConfig,
    /// Handle to the shared block.
    pub block: Arc<SharedBlock>,
    /// The receiving worker's index.
    pub worker: WorkerIdx,
}

/// Coordinator → worker.
pub enum WorkerCommand {
    /// Bootstrap the worker.
    Init(WorkerInit),
    /// Enter the frame loop.
    Run,
}

/// Worker → coordinator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkerReply {
    /// Initialisation succeeded.
    Ready {
        /// The ready worker.
        worker: WorkerIdx,
        /// Heap bytes its task reserved during init.
        heap_used: usize,
    },
    /// Initialisation failed; the worker thread has exited.
    InitFailed {
        /// The failing worker.
        worker: WorkerIdx,
        /// Human-readable cause.
        reason: String,
    },
}

// ── WorkerState ────────────────────────────────────────────────────

/// Everything one worker needs to render its share of a frame.
///
/// Aux threads own one each; the coordinator owns worker 0's.
pub(crate) struct WorkerState {
    worker: WorkerIdx,
    layout: Arc<MemoryLayout>,
    block: Arc<SharedBlock>,
    heap: RegionHeap,
    task: Box<dyn FrameTask>,
    frames: u64,
}

impl WorkerState {
    /// Recompute the layout, verify the block, and initialise the task.
    pub(crate) fn init(
        worker: WorkerIdx,
        config: &EngineConfig,
        block: Arc<SharedBlock>,
        factory: &dyn TaskFactory,
    ) -> Result<Self, ConfigError> {
        let layout = compute(&config.layout_config())?;
        if !block.matches(&layout) {
            return Err(ConfigError::LayoutMismatch {
                worker,
                expected: layout.total_size(),
                actual: block.len_bytes(),
            });
        }
        let region = layout
            .worker_heap(worker)
            .ok_or_else(|| ConfigError::WorkerInit {
                worker,
                reason: format!("index out of range for {} workers", layout.num_workers()),
            })?;
        let mut heap = RegionHeap::new(region);
        let mut task = factory.create(worker);
        {
            let mut ctx = InitContext {
                worker,
                num_workers: layout.num_workers(),
                heap: &mut heap,
                view: block.view(&layout),
            };
            task.init(&mut ctx).map_err(|e| ConfigError::WorkerInit {
                worker,
                reason: e.to_string(),
            })?;
        }
        block.view(&layout).mem_counters().publish(worker, heap.used());
        Ok(Self {
            worker,
            layout: Arc::new(layout),
            block,
            heap,
            task,
            frames: 0,
        })
    }

    pub(crate) fn heap_used(&self) -> usize {
        self.heap.used()
    }

    /// Run the task for one frame. A panic is caught and returned as text.
    pub(crate) fn render_frame(&mut self) -> Result<(), String> {
        let view = self.block.view(&self.layout);
        let mut ctx = FrameContext {
            worker: self.worker,
            num_workers: self.layout.num_workers(),
            frame: self.frames,
            rows: task_range(self.worker, self.layout.num_workers(), self.layout.frame_height()),
            heap: &mut self.heap,
            view,
        };
        let task = &mut self.task;
        let result = catch_unwind(AssertUnwindSafe(|| task.render(&mut ctx)));
        self.frames += 1;
        view.mem_counters().publish(self.worker, self.heap.used());
        result.map_err(|payload| panic_message(payload.as_ref()))
    }

    /// Frame loop for an aux thread: park, render, signal, until EXIT.
    fn run_frames(&mut self) {
        let block = Arc::clone(&self.block);
        let layout = Arc::clone(&self.layout);
        let sync = SyncArray::new(block.view(&layout).sync_cells());
        while sync.wait_go(self.worker) == Signal::Go {
            if let Err(reason) = self.render_frame() {
                tracing::error!(worker = %self.worker, reason = %reason, "frame task panicked");
            }
            sync.signal_done(self.worker);
        }
        tracing::debug!(worker = %self.worker, frames = self.frames, "worker exiting");
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// ── WorkerPool ─────────────────────────────────────────────────────

/// The aux worker threads of one engine.
pub struct WorkerPool {
    block: Arc<SharedBlock>,
    layout: Arc<MemoryLayout>,
    commands: Vec<Sender<WorkerCommand>>,
    handles: Vec<JoinHandle<()>>,
    running: bool,
}

impl WorkerPool {
    /// Spawn `num_workers - 1` aux threads and complete the INIT handshake.
    ///
    /// Blocks until every worker has replied.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ThreadSpawnFailed`] if a thread cannot be spawned,
    /// [`ConfigError::WorkerInit`] for the first worker that reports
    /// failure. Already-started workers are torn down before returning.
    pub fn spawn(
        config: &EngineConfig,
        layout: Arc<MemoryLayout>,
        block: Arc<SharedBlock>,
        factory: Arc<dyn TaskFactory>,
    ) -> Result<Self, ConfigError> {
        let started = Instant::now();
        let (reply_tx, reply_rx) = crossbeam_channel::unbounded();
        let mut pool = Self {
            block: Arc::clone(&block),
            layout,
            commands: Vec::new(),
            handles: Vec::new(),
            running: false,
        };

        for worker in WorkerIdx::aux(config.num_workers) {
            let (cmd_tx, cmd_rx) = crossbeam_channel::bounded(2);
            let reply_tx = reply_tx.clone();
            let factory = Arc::clone(&factory);
            let handle = thread::Builder::new()
                .name(format!("weft-worker-{worker}"))
                .spawn(move || worker_main(worker, &cmd_rx, &reply_tx, factory.as_ref()))
                .map_err(|e| ConfigError::ThreadSpawnFailed {
                    reason: format!("weft-worker-{worker}: {e}"),
                })?;
            pool.handles.push(handle);
            // A send only fails if the thread already died; its reply
            // channel drop surfaces that below.
            let _ = cmd_tx.send(WorkerCommand::Init(WorkerInit {
                config: config.clone(),
                block: Arc::clone(&block),
                worker,
            }));
            pool.commands.push(cmd_tx);
        }
        drop(reply_tx);

        let expected = pool.commands.len();
        let mut heap_total = 0usize;
        for _ in 0..expected {
            match reply_rx.recv() {
                Ok(WorkerReply::Ready { worker, heap_used }) => {
                    tracing::debug!(%worker, heap_used, "worker ready");
                    heap_total += heap_used;
                }
                Ok(WorkerReply::InitFailed { worker, reason }) => {
                    return Err(ConfigError::WorkerInit { worker, reason });
                }
                Err(_) => {
                    return Err(ConfigError::WorkerInit {
                        worker: WorkerIdx::COORDINATOR,
                        reason: "worker thread exited before replying".to_string(),
                    });
                }
            }
        }

        tracing::info!(
            workers = expected,
            heap_used = heap_total,
            init_ms = started.elapsed().as_millis() as u64,
            "worker pool ready"
        );
        Ok(pool)
    }

    /// Send RUN to every worker.
    pub fn run(&mut self) {
        if self.running {
            return;
        }
        for tx in &self.commands {
            let _ = tx.send(WorkerCommand::Run);
        }
        self.running = true;
    }

    /// Number of aux threads still owned by the pool.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether the pool has no threads.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Whether RUN has been sent.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Release every worker and join the threads. Returns how many joined
    /// cleanly. Idempotent.
    pub fn shutdown(&mut self) -> usize {
        SyncArray::new(self.block.view(&self.layout).sync_cells()).release_all();
        // Workers still waiting for RUN see a closed channel.
        self.commands.clear();
        let mut joined = 0;
        for handle in self.handles.drain(..) {
            if handle.join().is_ok() {
                joined += 1;
            }
        }
        self.running = false;
        joined
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_main(
    worker: WorkerIdx,
    commands: &Receiver<WorkerCommand>,
    replies: &Sender<WorkerReply>,
    factory: &dyn TaskFactory,
) {
    let init = match commands.recv() {
        Ok(WorkerCommand::Init(init)) => init,
        Ok(WorkerCommand::Run) => {
            let _ = replies.send(WorkerReply::InitFailed {
                worker,
                reason: "RUN received before INIT".to_string(),
            });
            return;
        }
        Err(_) => return,
    };
    debug_assert_eq!(init.worker, worker);

    let mut state = match WorkerState::init(worker, &init.config, init.block, factory) {
        Ok(state) => state,
        Err(e) => {
            tracing::warn!(%worker, error = %e, "worker init failed");
            let _ = replies.send(WorkerReply::InitFailed {
                worker,
                reason: e.to_string(),
            });
            return;
        }
    };
    let _ = replies.send(WorkerReply::Ready {
        worker,
        heap_used: state.heap_used(),
    });

    loop {
        match commands.recv() {
            Ok(WorkerCommand::Run) => break,
            Ok(WorkerCommand::Init(_)) => {
                tracing::warn!(%worker, "duplicate INIT ignored");
            }
            Err(_) => return,
        }
    }
    state.run_frames();
}
