//! Engine configuration, validation, and derived timing constants.
//!
//! [`EngineConfig`] is produced once at startup by the external config
//! loader (usually from a TOML file) and never changes afterwards. Every
//! worker receives the same value and derives the same memory layout
//! from its [`LayoutConfig`] projection.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::{MILLIS_PER_SEC, PAGE_SIZE};

// ── LayoutConfig ───────────────────────────────────────────────────

/// The subset of the configuration that determines the memory layout.
///
/// Two equal `LayoutConfig` values always produce byte-identical layouts.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Frame width in pixels.
    pub frame_width: u32,
    /// Frame height in pixels.
    pub frame_height: u32,
    /// Total workers, including the coordinator's own share.
    pub num_workers: u32,
    /// Bytes of private heap per worker.
    pub worker_heap_size_bytes: usize,
    /// Bytes of heap shared by all workers.
    pub shared_heap_size_bytes: usize,
    /// Bytes reserved for the font glyph table.
    pub font_chars_bytes: usize,
    /// Bytes reserved for the string table.
    pub strings_bytes: usize,
    /// Bytes reserved for the image index table.
    pub images_index_bytes: usize,
    /// Bytes reserved for image pixel data.
    pub images_bytes: usize,
    /// Number of input keys tracked (one byte each).
    pub input_keys: usize,
    /// Upper bound on the whole block.
    pub max_memory_bytes: usize,
}

// ── EngineConfig ───────────────────────────────────────────────────

/// Complete configuration for a weft engine.
///
/// All fields have defaults, so a TOML file only needs to name the
/// settings it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Frame width in pixels. Default: 320.
    pub frame_width: u32,
    /// Frame height in pixels. Default: 200.
    pub frame_height: u32,
    /// Total workers including the coordinator's own share. Default: 4.
    pub num_workers: u32,
    /// Private heap per worker in bytes. Default: one 64 KiB page.
    pub worker_heap_size_bytes: usize,
    /// Shared heap in bytes. Default: 16 pages.
    pub shared_heap_size_bytes: usize,
    /// Simulation updates per second. Default: 80.
    pub target_ups: f64,
    /// Display callbacks per second for the headless driver. Default: 60.
    pub target_rps: f64,
    /// Scales the simulated time per update step. Default: 1.
    pub multiplier: f64,
    /// Wall time between stats emissions, in ms. Default: 100.
    pub stats_period_ms: f64,
    /// Raw tick deltas averaged before entering the accumulator. Default: 5.
    pub delta_samples: usize,
    /// Frame-time samples behind the render-rate statistic. Default: 10.
    pub frame_time_samples: usize,
    /// Rolling-average length in the stats aggregator. Default: 10.
    pub stats_samples: usize,
    /// Font glyph table size in bytes. Default: 0.
    pub font_chars_bytes: usize,
    /// String table size in bytes. Default: 0.
    pub strings_bytes: usize,
    /// Image index table size in bytes. Default: 0.
    pub images_index_bytes: usize,
    /// Image pixel data size in bytes. Default: 0.
    pub images_bytes: usize,
    /// Input keys tracked. Default: 128.
    pub input_keys: usize,
    /// Maximum size of the shared block. Default: 320 pages (20 MiB).
    pub max_memory_bytes: usize,
    /// Optional deadline on each barrier wait, in ms. Default: none
    /// (wait indefinitely).
    pub barrier_timeout_ms: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            frame_width: 320,
            frame_height: 200,
            num_workers: 4,
            worker_heap_size_bytes: PAGE_SIZE,
            shared_heap_size_bytes: 16 * PAGE_SIZE,
            target_ups: 80.0,
            target_rps: 60.0,
            multiplier: 1.0,
            stats_period_ms: 100.0,
            delta_samples: 5,
            frame_time_samples: 10,
            stats_samples: 10,
            font_chars_bytes: 0,
            strings_bytes: 0,
            images_index_bytes: 0,
            images_bytes: 0,
            input_keys: 128,
            max_memory_bytes: 320 * PAGE_SIZE,
            barrier_timeout_ms: None,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Validate every setting that does not depend on the layout.
    ///
    /// Size limits are checked by the layout planner, which is the only
    /// place the sizes are summed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.frame_width == 0 || self.frame_height == 0 {
            return Err(ConfigError::EmptyFrame {
                width: self.frame_width,
                height: self.frame_height,
            });
        }
        check_rate("target_ups", self.target_ups)?;
        check_rate("target_rps", self.target_rps)?;
        check_rate("multiplier", self.multiplier)?;
        check_rate("stats_period_ms", self.stats_period_ms)?;
        // The period must also be finite (rejects subnormal rates).
        check_rate("update_period_ms", self.update_period_ms())?;
        check_rate("render_period_ms", self.render_period_ms())?;
        for (name, len) in [
            ("delta_samples", self.delta_samples),
            ("frame_time_samples", self.frame_time_samples),
            ("stats_samples", self.stats_samples),
        ] {
            if len == 0 {
                return Err(ConfigError::ZeroWindow { name });
            }
        }
        if self.barrier_timeout_ms == Some(0) {
            return Err(ConfigError::InvalidRate {
                name: "barrier_timeout_ms",
                value: 0.0,
            });
        }
        Ok(())
    }

    /// Simulated milliseconds consumed by one update step.
    pub fn update_period_ms(&self) -> f64 {
        self.multiplier * MILLIS_PER_SEC / self.target_ups
    }

    /// Largest tick delta admitted into the accumulator, in ms.
    ///
    /// Accumulated time beyond this triggers a resync.
    pub fn update_time_max_ms(&self) -> f64 {
        self.update_period_ms() * 8.0
    }

    /// Milliseconds between display callbacks.
    pub fn render_period_ms(&self) -> f64 {
        MILLIS_PER_SEC / self.target_rps
    }

    /// Number of aux worker threads (all workers except the coordinator).
    pub fn num_aux_workers(&self) -> u32 {
        self.num_workers.saturating_sub(1)
    }

    /// Project the fields that determine the memory layout.
    pub fn layout_config(&self) -> LayoutConfig {
        LayoutConfig {
            frame_width: self.frame_width,
            frame_height: self.frame_height,
            num_workers: self.num_workers,
            worker_heap_size_bytes: self.worker_heap_size_bytes,
            shared_heap_size_bytes: self.shared_heap_size_bytes,
            font_chars_bytes: self.font_chars_bytes,
            strings_bytes: self.strings_bytes,
            images_index_bytes: self.images_index_bytes,
            images_bytes: self.images_bytes,
            input_keys: self.input_keys,
            max_memory_bytes: self.max_memory_bytes,
        }
    }
}

fn check_rate(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidRate { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn update_period_at_80_ups() {
        let cfg = EngineConfig {
            target_ups: 80.0,
            multiplier: 1.0,
            ..EngineConfig::default()
        };
        assert!((cfg.update_period_ms() - 12.5).abs() < 1e-12);
        assert!((cfg.update_time_max_ms() - 100.0).abs() < 1e-12);
    }

    #[test]
    fn multiplier_scales_period() {
        let cfg = EngineConfig {
            target_ups: 100.0,
            multiplier: 2.0,
            ..EngineConfig::default()
        };
        assert!((cfg.update_period_ms() - 20.0).abs() < 1e-12);
    }

    #[test]
    fn zero_workers_rejected() {
        let cfg = EngineConfig {
            num_workers: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::NoWorkers)));
    }

    #[test]
    fn empty_frame_rejected() {
        let cfg = EngineConfig {
            frame_height: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::EmptyFrame { height: 0, .. })
        ));
    }

    #[test]
    fn nan_ups_rejected() {
        let cfg = EngineConfig {
            target_ups: f64::NAN,
            ..EngineConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidRate {
                name: "target_ups",
                ..
            })
        ));
    }

    #[test]
    fn subnormal_rps_rejected() {
        let cfg = EngineConfig {
            target_rps: f64::from_bits(1),
            ..EngineConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidRate { .. })
        ));
    }

    #[test]
    fn zero_smoothing_window_rejected() {
        let cfg = EngineConfig {
            delta_samples: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::ZeroWindow {
                name: "delta_samples"
            })
        ));
    }

    #[test]
    fn zero_barrier_timeout_rejected() {
        let cfg = EngineConfig {
            barrier_timeout_ms: Some(0),
            ..EngineConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let cfg = EngineConfig::from_toml_str(
            "frame_width = 64\nframe_height = 48\nnum_workers = 2\n",
        )
        .unwrap();
        assert_eq!(cfg.frame_width, 64);
        assert_eq!(cfg.frame_height, 48);
        assert_eq!(cfg.num_workers, 2);
        assert_eq!(cfg.target_ups, 80.0);
        assert_eq!(cfg.barrier_timeout_ms, None);
    }

    #[test]
    fn toml_barrier_timeout_parses() {
        let cfg = EngineConfig::from_toml_str("barrier_timeout_ms = 250\n").unwrap();
        assert_eq!(cfg.barrier_timeout_ms, Some(250));
    }

    #[test]
    fn invalid_toml_value_is_parse_error() {
        let err = EngineConfig::from_toml_str("num_workers = \"many\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn toml_with_zero_workers_fails_validation() {
        let err = EngineConfig::from_toml_str("num_workers = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::NoWorkers));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = EngineConfig::from_path("/nonexistent/weft.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn layout_config_projects_sizes() {
        let cfg = EngineConfig::default();
        let layout = cfg.layout_config();
        assert_eq!(layout.num_workers, cfg.num_workers);
        assert_eq!(layout.worker_heap_size_bytes, cfg.worker_heap_size_bytes);
        assert_eq!(layout.max_memory_bytes, cfg.max_memory_bytes);
    }

    #[test]
    fn aux_workers_exclude_coordinator() {
        let cfg = EngineConfig {
            num_workers: 1,
            ..EngineConfig::default()
        };
        assert_eq!(cfg.num_aux_workers(), 0);
        let cfg = EngineConfig {
            num_workers: 5,
            ..EngineConfig::default()
        };
        assert_eq!(cfg.num_aux_workers(), 4);
    }
}
