//! Time sources and the fixed-timestep accumulator.
//!
//! [`FrameClock`] turns raw tick deltas into whole update steps of
//! `update_period_ms`. Each delta is clamped to `[0, update_time_max_ms]`
//! and smoothed over the last `delta_samples` raw deltas before entering
//! the accumulator. When the accumulator would exceed
//! `update_time_max_ms`, or a single raw delta does, the clock resyncs:
//! unconsumed time is discarded instead of drained, which bounds the
//! catch-up after a long pause (the spiral of death).

use std::time::Instant;

use weft_core::EngineConfig;

use crate::ring::RollingWindow;

// ── TimeSource ─────────────────────────────────────────────────────

/// A monotonic millisecond clock.
pub trait TimeSource: Send {
    /// Milliseconds since an arbitrary fixed origin.
    fn now_ms(&self) -> f64;
}

/// Wall-clock [`TimeSource`] backed by [`Instant`].
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// A clock whose origin is now.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

// ── FrameClock ─────────────────────────────────────────────────────

/// Result of feeding one tick delta to a [`FrameClock`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClockStep {
    /// The delta that entered the accumulator, after clamping and smoothing.
    pub smoothed_ms: f64,
    /// Whole update steps drained this tick.
    pub updates: u32,
    /// Whether accumulated time was discarded this tick.
    pub resynced: bool,
}

/// Fixed-timestep accumulator. Owned by the coordinator, never shared.
#[derive(Clone, Debug)]
pub struct FrameClock {
    update_period_ms: f64,
    update_time_max_ms: f64,
    accumulator: f64,
    resync: bool,
    deltas: RollingWindow,
    update_count: u64,
    resync_count: u64,
    smoothed_total_ms: f64,
}

impl FrameClock {
    /// A clock with the timing constants of `config`.
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_period(config.update_period_ms(), config.delta_samples)
    }

    /// A clock with an explicit period and smoothing window.
    ///
    /// `update_time_max_ms` is eight periods.
    pub fn with_period(update_period_ms: f64, delta_samples: usize) -> Self {
        Self {
            update_period_ms,
            update_time_max_ms: update_period_ms * 8.0,
            accumulator: 0.0,
            resync: false,
            deltas: RollingWindow::new(delta_samples),
            update_count: 0,
            resync_count: 0,
            smoothed_total_ms: 0.0,
        }
    }

    /// Feed one raw tick delta and drain whole update steps.
    pub fn advance(&mut self, raw_delta_ms: f64) -> ClockStep {
        // NaN compares false on both sides and becomes 0.
        let clamped = if raw_delta_ms > self.update_time_max_ms {
            self.resync = true;
            self.update_time_max_ms
        } else if raw_delta_ms > 0.0 {
            raw_delta_ms
        } else {
            0.0
        };
        self.deltas.push(clamped);
        let smoothed = self.deltas.average().unwrap_or(clamped);

        self.accumulator += smoothed;
        self.smoothed_total_ms += smoothed;
        if self.accumulator > self.update_time_max_ms {
            self.resync = true;
        }

        let resynced = self.resync;
        if resynced {
            self.accumulator = 0.0;
            self.resync = false;
            self.resync_count += 1;
            // A pause must not keep inflating the following ticks.
            self.deltas.clear();
            tracing::warn!(
                raw_delta_ms,
                update_time_max_ms = self.update_time_max_ms,
                "frame clock resync, accumulated time discarded"
            );
        }

        let mut updates = 0u32;
        while self.accumulator >= self.update_period_ms {
            self.accumulator -= self.update_period_ms;
            updates += 1;
        }
        self.update_count += u64::from(updates);

        ClockStep {
            smoothed_ms: smoothed,
            updates,
            resynced,
        }
    }

    /// Ask for the next [`advance`](Self::advance) to discard accumulated time.
    ///
    /// For hosts that know the display was suspended.
    pub fn request_resync(&mut self) {
        self.resync = true;
    }

    /// Unconsumed simulated time, in ms.
    pub fn accumulator(&self) -> f64 {
        self.accumulator
    }

    /// Update steps drained since creation.
    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    /// Resyncs since creation.
    pub fn resync_count(&self) -> u64 {
        self.resync_count
    }

    /// Sum of every smoothed delta fed to the accumulator, in ms.
    pub fn smoothed_total_ms(&self) -> f64 {
        self.smoothed_total_ms
    }

    /// Milliseconds per update step.
    pub fn update_period_ms(&self) -> f64 {
        self.update_period_ms
    }

    /// Resync threshold, in ms.
    pub fn update_time_max_ms(&self) -> f64 {
        self.update_time_max_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const PERIOD_80_UPS: f64 = 12.5;

    #[test]
    fn unsmoothed_jittered_ticks_drain_four_updates() {
        let mut clock = FrameClock::with_period(PERIOD_80_UPS, 1);
        let steps: Vec<_> = [12.0, 13.0, 12.0, 13.0]
            .into_iter()
            .map(|d| clock.advance(d))
            .collect();
        assert_eq!(clock.update_count(), 4);
        assert!(clock.accumulator() < PERIOD_80_UPS);
        assert!(steps.iter().all(|s| !s.resynced));
        assert_eq!(clock.resync_count(), 0);
    }

    #[test]
    fn default_window_jittered_ticks_drain_three_updates() {
        let config = EngineConfig {
            target_ups: 80.0,
            multiplier: 1.0,
            ..EngineConfig::default()
        };
        assert_eq!(config.delta_samples, 5);
        let mut clock = FrameClock::new(&config);
        let steps: Vec<_> = [12.0, 13.0, 12.0, 13.0]
            .into_iter()
            .map(|d| clock.advance(d))
            .collect();
        // Partial-window averages: 12, 12.5, 12.33, 12.5.
        assert_eq!(steps[0].smoothed_ms, 12.0);
        assert_eq!(steps[1].smoothed_ms, 12.5);
        assert_eq!(clock.update_count(), 3);
        assert!((clock.accumulator() - (49.0 + 1.0 / 3.0 - 37.5)).abs() < 1e-9);
        assert!(clock.accumulator() < PERIOD_80_UPS);
        assert!(steps.iter().all(|s| !s.resynced));
    }

    #[test]
    fn config_constants_match_80_ups() {
        let config = EngineConfig {
            target_ups: 80.0,
            multiplier: 1.0,
            ..EngineConfig::default()
        };
        let clock = FrameClock::new(&config);
        assert_eq!(clock.update_period_ms(), 12.5);
        assert_eq!(clock.update_time_max_ms(), 100.0);
    }

    #[test]
    fn long_pause_resyncs_once_without_catch_up() {
        let mut clock = FrameClock::with_period(PERIOD_80_UPS, 5);
        for _ in 0..10 {
            assert!(!clock.advance(PERIOD_80_UPS).resynced);
        }
        let before = clock.update_count();
        let pause = clock.advance(500.0);
        assert!(pause.resynced);
        assert_eq!(pause.updates, 0);
        assert_eq!(clock.accumulator(), 0.0);

        let next = clock.advance(PERIOD_80_UPS);
        assert!(!next.resynced);
        assert_eq!(next.updates, 1);
        assert_eq!(clock.update_count(), before + 1);
        assert_eq!(clock.resync_count(), 1);
    }

    #[test]
    fn pause_without_smoothing_resyncs() {
        let mut clock = FrameClock::with_period(PERIOD_80_UPS, 1);
        clock.advance(16.0);
        let pause = clock.advance(500.0);
        assert!(pause.resynced);
        assert_eq!(pause.updates, 0);
        assert_eq!(clock.advance(12.5).updates, 1);
    }

    #[test]
    fn smoothing_averages_recent_deltas() {
        let mut clock = FrameClock::with_period(PERIOD_80_UPS, 2);
        assert_eq!(clock.advance(10.0).smoothed_ms, 10.0);
        assert_eq!(clock.advance(20.0).smoothed_ms, 15.0);
        assert_eq!(clock.advance(30.0).smoothed_ms, 25.0);
    }

    #[test]
    fn negative_and_nan_deltas_clamp_to_zero() {
        let mut clock = FrameClock::with_period(PERIOD_80_UPS, 1);
        assert_eq!(clock.advance(-5.0).smoothed_ms, 0.0);
        assert_eq!(clock.advance(f64::NAN).smoothed_ms, 0.0);
        assert_eq!(clock.update_count(), 0);
    }

    #[test]
    fn requested_resync_discards_once() {
        let mut clock = FrameClock::with_period(PERIOD_80_UPS, 1);
        clock.advance(10.0);
        clock.request_resync();
        let step = clock.advance(10.0);
        assert!(step.resynced);
        assert_eq!(clock.accumulator(), 0.0);
        let step = clock.advance(10.0);
        assert!(!step.resynced);
        assert_eq!(clock.accumulator(), 10.0);
    }

    #[test]
    fn multiplier_changes_step_size() {
        let config = EngineConfig {
            target_ups: 50.0,
            multiplier: 2.0,
            ..EngineConfig::default()
        };
        let mut clock = FrameClock::with_period(config.update_period_ms(), 1);
        assert_eq!(clock.update_period_ms(), 40.0);
        assert_eq!(clock.advance(39.0).updates, 0);
        assert_eq!(clock.advance(2.0).updates, 1);
    }

    proptest! {
        #[test]
        fn accumulator_stays_below_max(
            deltas in prop::collection::vec(-50.0f64..400.0, 1..200),
            window in 1usize..8,
        ) {
            let mut clock = FrameClock::with_period(PERIOD_80_UPS, window);
            for d in deltas {
                clock.advance(d);
                prop_assert!(clock.accumulator() < clock.update_time_max_ms());
                prop_assert!(clock.accumulator() >= 0.0);
                prop_assert!(clock.accumulator() < clock.update_period_ms());
            }
        }

        #[test]
        fn updates_never_exceed_smoothed_time(
            deltas in prop::collection::vec(0.0f64..250.0, 1..200),
            window in 1usize..8,
        ) {
            let mut clock = FrameClock::with_period(PERIOD_80_UPS, window);
            for d in deltas {
                clock.advance(d);
                let consumed = clock.update_count() as f64 * clock.update_period_ms();
                prop_assert!(consumed <= clock.smoothed_total_ms() + 1e-6);
            }
        }

        #[test]
        fn resync_count_matches_steps(
            deltas in prop::collection::vec(0.0f64..1000.0, 1..100),
        ) {
            let mut clock = FrameClock::with_period(PERIOD_80_UPS, 1);
            let mut seen = 0u64;
            for d in deltas {
                if clock.advance(d).resynced {
                    seen += 1;
                }
            }
            prop_assert_eq!(seen, clock.resync_count());
        }
    }
}
