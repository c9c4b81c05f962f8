//! Core types for the weft shared-memory frame engine.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the pieces every other weft crate agrees on: the engine
//! configuration, worker identifiers, the error taxonomy, and the
//! deterministic range partition used to split frame work between
//! workers.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod id;
pub mod partition;

pub use config::{EngineConfig, LayoutConfig};
pub use error::{AllocError, ConfigError, PresentError, StallError};
pub use id::WorkerIdx;
pub use partition::task_range;

/// Milliseconds in one second.
pub const MILLIS_PER_SEC: f64 = 1000.0;

/// Bytes in one 64 KiB memory page.
pub const PAGE_SIZE: usize = 64 * 1024;

/// Bytes per RGBA pixel in the frame buffer.
pub const BYTES_PER_PIXEL: usize = 4;
