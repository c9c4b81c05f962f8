//! Per-tick and cumulative metrics for the frame scheduler.
//!
//! [`FrameMetrics`] describes the most recent tick; [`SchedulerCounters`]
//! accumulate over the scheduler's lifetime.

/// Timing and outcome of a single tick.
///
/// Durations are in microseconds.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameMetrics {
    /// Raw time since the previous tick, in ms.
    pub delta_ms: f64,
    /// Delta after clamping and smoothing, in ms.
    pub smoothed_ms: f64,
    /// Update steps drained this tick.
    pub updates: u32,
    /// Whether accumulated time was discarded this tick.
    pub resynced: bool,
    /// Time from "go" until every worker was done.
    pub barrier_us: u64,
    /// Time from "go" until the frame was handed to the sink.
    pub render_us: u64,
    /// Whether the sink accepted the frame.
    pub presented: bool,
    /// Workers not given work because they were still busy.
    pub skipped_workers: u32,
}

/// Totals since the scheduler started.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SchedulerCounters {
    /// Ticks processed.
    pub ticks: u64,
    /// Frames the sink accepted.
    pub frames_presented: u64,
    /// Frames dropped for any reason.
    pub frames_skipped: u64,
    /// Update steps drained.
    pub updates: u64,
    /// Resyncs performed.
    pub resyncs: u64,
    /// Barrier waits that hit the configured deadline.
    pub stalls: u64,
    /// Frames dropped because a worker was still busy and got no work.
    pub partial_frames: u64,
    /// Stats emissions.
    pub stats_emitted: u64,
}
