//! Frame engine driving a weft shared block.
//!
//! Owns the worker threads and the coordinator-side frame loop: a
//! fixed-timestep clock for updates, a variable-rate render driven by
//! the display callback, and rolling statistics for an external UI.
//!
//! # Architecture
//!
//! ```text
//! Display callback / DisplayDriver        Aux workers (N - 1)
//!     |                                        |
//!     | FrameScheduler::tick                   | SyncArray::wait_go (parked)
//!     |   FrameClock::advance                  |
//!     |   HrTimer::store                       |
//!     |   SyncArray::go_all ------------------>| FrameTask::render (own rows)
//!     |   FrameTask::render (worker 0 rows)    |
//!     |   SyncArray::wait_all_done <-----------| SyncArray::signal_done
//!     |   FrameBuffer::copy_into               |
//!     |   PresentSink::present                 |
//!     |   StatsAggregator (every period) ──▶ EngineEvent::Stats
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod clock;
pub mod driver;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod present;
pub mod ring;
pub mod scheduler;
pub mod stats;
pub mod task;
pub mod worker;

pub use clock::{ClockStep, FrameClock, MonotonicClock, TimeSource};
pub use driver::{DisplayDriver, StopHandle};
pub use engine::{Engine, ShutdownReport};
pub use error::EngineError;
pub use metrics::{FrameMetrics, SchedulerCounters};
pub use present::{FrameImage, NullSink, PresentSink};
pub use ring::RollingWindow;
pub use scheduler::{EngineEvent, FrameScheduler, SchedulerState};
pub use stats::{StatsAggregator, StatsName, StatsValues, UnknownStat};
pub use task::{FillTask, FrameContext, FrameTask, InitContext, TaskFactory};
pub use worker::{WorkerCommand, WorkerInit, WorkerPool, WorkerReply};
