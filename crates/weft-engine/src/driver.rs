//! Headless display driver.
//!
//! Stands in for the display refresh callback: calls
//! [`Engine::tick_now`] once per `render_period_ms`, never re-entrantly,
//! and sleeps out whatever is left of each period.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use weft_core::EngineConfig;

use crate::engine::Engine;
use crate::error::EngineError;
use crate::present::PresentSink;

/// Raises the stop flag of a [`DisplayDriver`] from another thread.
#[derive(Clone, Debug)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Ask the driver to return after the current tick.
    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether stop has been requested.
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Fixed-rate tick loop for hosts without a display callback.
#[derive(Debug)]
pub struct DisplayDriver {
    period: Duration,
    stop: Arc<AtomicBool>,
    max_frames: Option<u64>,
}

impl DisplayDriver {
    /// A driver ticking at `config.target_rps`.
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_period(Duration::from_micros((config.render_period_ms() * 1000.0).round() as u64))
    }

    /// A driver with an explicit callback period.
    pub fn with_period(period: Duration) -> Self {
        Self {
            period,
            stop: Arc::new(AtomicBool::new(false)),
            max_frames: None,
        }
    }

    /// Return after `frames` ticks.
    pub fn max_frames(mut self, frames: u64) -> Self {
        self.max_frames = Some(frames);
        self
    }

    /// Callback period.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// A handle that stops [`run`](Self::run) from another thread.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(Arc::clone(&self.stop))
    }

    /// Tick `engine` until stopped or the frame budget is spent.
    ///
    /// Starts the engine's workers if they are not running yet. Returns
    /// the number of ticks performed.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotRunning`] if the engine has been shut down.
    pub fn run(&self, engine: &mut Engine, sink: &mut dyn PresentSink) -> Result<u64, EngineError> {
        engine.run()?;
        let mut ticks = 0u64;
        tracing::debug!(period_ms = self.period.as_secs_f64() * 1000.0, "display driver started");
        loop {
            if self.stop.load(Ordering::Acquire) {
                break;
            }
            if self.max_frames.is_some_and(|max| ticks >= max) {
                break;
            }

            let tick_start = Instant::now();
            engine.tick_now(sink)?;
            ticks += 1;

            if let Some(remaining) = self.period.checked_sub(tick_start.elapsed()) {
                std::thread::sleep(remaining);
            }
        }
        tracing::debug!(ticks, "display driver stopped");
        Ok(ticks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_follows_target_rps() {
        let cfg = EngineConfig {
            target_rps: 50.0,
            ..EngineConfig::default()
        };
        assert_eq!(DisplayDriver::new(&cfg).period(), Duration::from_millis(20));
    }

    #[test]
    fn stop_handle_shares_flag() {
        let driver = DisplayDriver::with_period(Duration::from_millis(1));
        let handle = driver.stop_handle();
        assert!(!handle.is_stopped());
        handle.clone().stop();
        assert!(handle.is_stopped());
        assert!(driver.stop.load(Ordering::Acquire));
    }
}
