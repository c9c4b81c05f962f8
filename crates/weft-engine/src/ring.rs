//! Fixed-length rolling window of `f64` samples.

/// Ring buffer that averages its most recent samples.
///
/// Until the window has been filled once, the average covers only the
/// samples pushed so far.
#[derive(Clone, Debug)]
pub struct RollingWindow {
    samples: Vec<f64>,
    /// Total pushes since creation or the last clear.
    count: usize,
}

impl RollingWindow {
    /// A window holding the last `len` samples.
    ///
    /// # Panics
    ///
    /// Panics if `len` is zero. Configuration validation rejects zero
    /// window lengths before any window is built.
    pub fn new(len: usize) -> Self {
        assert!(len > 0, "RollingWindow length must be >= 1");
        Self {
            samples: vec![0.0; len],
            count: 0,
        }
    }

    /// Overwrite the oldest sample.
    pub fn push(&mut self, value: f64) {
        let pos = self.count % self.samples.len();
        self.samples[pos] = value;
        self.count += 1;
    }

    /// Mean of the retained samples, or `None` before the first push.
    pub fn average(&self) -> Option<f64> {
        let n = self.filled();
        if n == 0 {
            return None;
        }
        Some(self.samples[..n].iter().sum::<f64>() / n as f64)
    }

    /// Number of retained samples.
    pub fn filled(&self) -> usize {
        self.count.min(self.samples.len())
    }

    /// Window capacity.
    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    /// Drop all samples.
    pub fn clear(&mut self) {
        self.count = 0;
    }
}
