//! Rolling-average statistics fed by the frame scheduler.
//!
//! The aggregator is a pure sink: one writer pushes `(name, value)`
//! samples, readers take a [`StatsValues`] snapshot of the current
//! averages. Malformed samples are dropped without error.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::ring::RollingWindow;

/// The statistics the engine reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatsName {
    /// Presented frames per second.
    #[serde(rename = "FPS")]
    Fps,
    /// Update steps per second.
    #[serde(rename = "UPS")]
    Ups,
    /// Frames per second the frame work could sustain (1000 / mean frame time).
    #[serde(rename = "UFPS")]
    Ufps,
    /// Total worker heap usage, in MiB.
    #[serde(rename = "MEM")]
    Mem,
}

impl StatsName {
    /// Every statistic, in reporting order.
    pub const ALL: [StatsName; 4] = [StatsName::Fps, StatsName::Ups, StatsName::Ufps, StatsName::Mem];

    /// The display label.
    pub fn as_str(self) -> &'static str {
        match self {
            StatsName::Fps => "FPS",
            StatsName::Ups => "UPS",
            StatsName::Ufps => "UFPS",
            StatsName::Mem => "MEM",
        }
    }
}

impl fmt::Display for StatsName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An unrecognised statistic label.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownStat(pub String);

impl FromStr for StatsName {
    type Err = UnknownStat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StatsName::ALL
            .into_iter()
            .find(|n| n.as_str() == s)
            .ok_or_else(|| UnknownStat(s.to_string()))
    }
}

/// Snapshot of the current averages. Statistics with no samples are `None`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsValues {
    /// Average presented frames per second.
    #[serde(rename = "FPS")]
    pub fps: Option<f64>,
    /// Average update steps per second.
    #[serde(rename = "UPS")]
    pub ups: Option<f64>,
    /// Average sustainable frame rate.
    #[serde(rename = "UFPS")]
    pub ufps: Option<f64>,
    /// Average heap usage in MiB.
    #[serde(rename = "MEM")]
    pub mem: Option<f64>,
}

impl StatsValues {
    /// The value for `name`.
    pub fn get(&self, name: StatsName) -> Option<f64> {
        match name {
            StatsName::Fps => self.fps,
            StatsName::Ups => self.ups,
            StatsName::Ufps => self.ufps,
            StatsName::Mem => self.mem,
        }
    }
}

/// Fixed-length rolling average per statistic.
#[derive(Clone, Debug)]
pub struct StatsAggregator {
    windows: IndexMap<StatsName, RollingWindow>,
}

impl StatsAggregator {
    /// An aggregator averaging the last `samples` values of each statistic.
    pub fn new(samples: usize) -> Self {
        Self {
            windows: StatsName::ALL
                .into_iter()
                .map(|name| (name, RollingWindow::new(samples)))
                .collect(),
        }
    }

    /// Record one sample. Non-finite values are dropped.
    pub fn record(&mut self, name: StatsName, value: f64) {
        if !value.is_finite() {
            return;
        }
        if let Some(window) = self.windows.get_mut(&name) {
            window.push(value);
        }
    }

    /// Record a sample by label. Unknown labels are dropped.
    pub fn record_named(&mut self, name: &str, value: f64) {
        if let Ok(name) = name.parse() {
            self.record(name, value);
        }
    }

    /// Current average of `name`.
    pub fn average(&self, name: StatsName) -> Option<f64> {
        self.windows.get(&name).and_then(RollingWindow::average)
    }

    /// Snapshot of every average.
    pub fn values(&self) -> StatsValues {
        StatsValues {
            fps: self.average(StatsName::Fps),
            ups: self.average(StatsName::Ups),
            ufps: self.average(StatsName::Ufps),
            mem: self.average(StatsName::Mem),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_per_name() {
        let mut agg = StatsAggregator::new(3);
        agg.record(StatsName::Fps, 60.0);
        agg.record(StatsName::Fps, 30.0);
        agg.record(StatsName::Ups, 80.0);
        assert_eq!(agg.average(StatsName::Fps), Some(45.0));
        assert_eq!(agg.average(StatsName::Ups), Some(80.0));
        assert_eq!(agg.average(StatsName::Mem), None);
    }

    #[test]
    fn rolling_window_forgets_old_samples() {
        let mut agg = StatsAggregator::new(2);
        for v in [10.0, 20.0, 30.0] {
            agg.record(StatsName::Ufps, v);
        }
        assert_eq!(agg.average(StatsName::Ufps), Some(25.0));
    }

    #[test]
    fn malformed_samples_are_dropped() {
        let mut agg = StatsAggregator::new(4);
        agg.record(StatsName::Fps, f64::NAN);
        agg.record(StatsName::Fps, f64::INFINITY);
        agg.record_named("LATENCY", 5.0);
        agg.record_named("fps", 5.0);
        assert_eq!(agg.values(), StatsValues::default());
    }

    #[test]
    fn record_named_accepts_labels() {
        let mut agg = StatsAggregator::new(4);
        agg.record_named("MEM", 1.5);
        agg.record_named("UPS", 79.0);
        let v = agg.values();
        assert_eq!(v.mem, Some(1.5));
        assert_eq!(v.get(StatsName::Ups), Some(79.0));
    }

    #[test]
    fn names_roundtrip_through_labels() {
        for name in StatsName::ALL {
            assert_eq!(name.to_string().parse::<StatsName>(), Ok(name));
        }
        assert_eq!(
            "FOO".parse::<StatsName>(),
            Err(UnknownStat("FOO".to_string()))
        );
    }
}
