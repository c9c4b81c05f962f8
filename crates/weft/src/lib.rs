//! Weft: a shared-memory frame engine.
//!
//! One contiguous block is carved into named regions and shared by a
//! coordinator and a fixed set of worker threads. Every frame the
//! coordinator signals "go" through per-worker atomic cells, renders its
//! own share, waits for every "done", and presents the composed frame.
//! Simulation updates run on a fixed timestep decoupled from the render
//! rate.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all weft sub-crates.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use weft::prelude::*;
//!
//! // Every worker fills its own rows.
//! struct Fill;
//! impl FrameTask for Fill {
//!     fn render(&mut self, frame: &mut FrameContext<'_>) {
//!         frame.frame_buffer().fill_rows(frame.rows(), rgba(255, 0, 0, 255));
//!     }
//! }
//!
//! let config = EngineConfig {
//!     frame_width: 64,
//!     frame_height: 32,
//!     num_workers: 2,
//!     ..EngineConfig::default()
//! };
//! let factory: Arc<dyn TaskFactory> = Arc::new(|_: WorkerIdx| Box::new(Fill) as Box<dyn FrameTask>);
//! let mut engine = Engine::build(config, factory).unwrap();
//! engine.run().unwrap();
//! let metrics = engine.tick(0.0, &mut NullSink).unwrap();
//! assert!(metrics.presented);
//! assert_eq!(engine.scheduler().image().pixel(0, 31), Some(rgba(255, 0, 0, 255)));
//! engine.shutdown();
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `weft-core` | Configuration, errors, worker ids, range partition |
//! | [`memory`] | `weft-memory` | Layout planner, shared block, region views, region heaps |
//! | [`arena`] | `weft-arena` | Fixed-object-size slab allocator |
//! | [`sync`] | `weft-sync` | Go/done barrier and sleep cells |
//! | [`engine`] | `weft-engine` | Frame clock, scheduler, stats, worker pool, lifecycle |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Configuration, error taxonomy, and worker ids (`weft-core`).
pub use weft_core as types;

/// Memory layout planner and shared block (`weft-memory`).
///
/// [`memory::compute`] maps a configuration to a [`memory::MemoryLayout`];
/// [`memory::SharedBlock`] holds the bytes and hands out typed views.
pub use weft_memory as memory;

/// Fixed-object-size slab allocator (`weft-arena`).
pub use weft_arena as arena;

/// Per-worker barrier and sleep cells (`weft-sync`).
pub use weft_sync as sync;

/// Frame scheduler and engine lifecycle (`weft-engine`).
///
/// [`engine::Engine`] owns the block, the workers and the
/// [`engine::FrameScheduler`]; [`engine::DisplayDriver`] ticks it
/// headlessly.
pub use weft_engine as engine;

/// Common imports for typical weft usage.
pub mod prelude {
    // Core types
    pub use weft_core::{EngineConfig, WorkerIdx};

    // Errors
    pub use weft_core::{AllocError, ConfigError, PresentError, StallError};

    // Memory
    pub use weft_memory::{rgba, MemoryLayout, RegionHeap, RegionId};

    // Arena
    pub use weft_arena::{Arena, ArenaHandle};

    // Engine
    pub use weft_engine::{
        DisplayDriver, Engine, EngineError, EngineEvent, FrameContext, FrameImage, FrameMetrics, FrameTask,
        InitContext, NullSink, PresentSink, StatsValues, TaskFactory,
    };
}
