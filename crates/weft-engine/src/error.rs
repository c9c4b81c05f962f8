//! Errors surfaced by the engine lifecycle API.

use thiserror::Error;
use weft_core::{AllocError, ConfigError};

/// Failure of an [`Engine`](crate::Engine) lifecycle operation.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Startup failed; no worker is running.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// An allocation outside any frame failed.
    #[error(transparent)]
    Alloc(#[from] AllocError),
    /// The operation needs a running engine.
    #[error("engine is not running (state: {state})")]
    NotRunning {
        /// The state the engine was in.
        state: &'static str,
    },
}
