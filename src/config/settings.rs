//! Runtime settings for the heatmap animation pipeline
//!
//! This module contains the settings that drive rendering and playback,
//! separate from the persistent viewer preferences in [`super::AppConfig`].
//!
//! # Main Types
//!
//! - [`PipelineConfig`] - Rendering parameters plus the target production rate.
//!   Treated as an immutable snapshot; updates build a new value.
//! - [`ConfigPatch`] - A partial update, every field optional
//! - [`PlaybackConfig`] - Parameters fixed when a controller is constructed
//!   (buffer capacity, frame count policy, trail reset threshold)
//! - [`FrameCountPolicy`] - How mismatched left/right sequence lengths are reconciled
//!
//! # Validation
//!
//! [`PipelineConfig::validate`] rejects values the renderer cannot work with:
//! non-positive radius, smoothness or value range, zero grid or image
//! dimensions, non-finite numbers, and sizes beyond [`MAX_OUTPUT_PIXELS`],
//! [`MAX_GRID_CELLS`] or [`MAX_TRAIL_LENGTH`]. The target rate is never rejected, it is
//! clamped into [`MIN_RATE_HZ`]..=[`MAX_RATE_HZ`] instead.

use crate::error::{GaitVisError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lowest production rate the rate controller accepts
pub const MIN_RATE_HZ: f64 = 1.0;

/// Highest production rate the rate controller accepts
pub const MAX_RATE_HZ: f64 = 120.0;

/// Default number of pre-rendered frames kept ahead of display
pub const DEFAULT_BUFFER_CAPACITY: usize = 8;

/// Default production rate, matching the sensor sampling rate
pub const DEFAULT_TARGET_RATE_HZ: f64 = 64.0;

/// Full-scale reading of the pressure sensors
pub const DEFAULT_VALUE_MAX: f32 = 4095.0;

/// Largest composited image, in pixels (4096 x 4096)
pub const MAX_OUTPUT_PIXELS: u64 = 4096 * 4096;

/// Largest interpolation grid, in cells
pub const MAX_GRID_CELLS: u64 = 512 * 512;

/// Longest center-of-pressure trail per side
pub const MAX_TRAIL_LENGTH: usize = 1024;

/// Clamp a requested rate into the supported range
pub fn clamp_rate(hz: f64) -> f64 {
    if hz.is_nan() {
        return MIN_RATE_HZ;
    }
    hz.clamp(MIN_RATE_HZ, MAX_RATE_HZ)
}

/// Rendering and rate parameters for the heatmap pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Width of one side's heatmap in pixels
    #[serde(default = "default_width")]
    pub width: u32,

    /// Height of one side's heatmap in pixels
    #[serde(default = "default_height")]
    pub height: u32,

    /// Interpolation grid columns
    #[serde(default = "default_grid_width")]
    pub grid_width: u32,

    /// Interpolation grid rows
    #[serde(default = "default_grid_height")]
    pub grid_height: u32,

    /// Radial kernel radius in pixels
    #[serde(default = "default_radius")]
    pub radius: f32,

    /// Kernel falloff factor; larger values give tighter blobs
    #[serde(default = "default_smoothness")]
    pub smoothness: f32,

    /// Padding around and between the composited panels
    #[serde(default = "default_margin")]
    pub margin: u32,

    /// Width of the color scale panel on the trailing edge
    #[serde(default = "default_legend_width")]
    pub legend_width: u32,

    /// Number of center-of-pressure points kept per side
    #[serde(default = "default_trail_length")]
    pub trail_length: usize,

    /// Reading mapped to the top of the color scale
    #[serde(default = "default_value_max")]
    pub value_max: f32,

    /// Requested production rate in Hz
    #[serde(default = "default_target_rate_hz")]
    pub target_rate_hz: f64,
}

fn default_width() -> u32 {
    175
}

fn default_height() -> u32 {
    520
}

fn default_grid_width() -> u32 {
    20
}

fn default_grid_height() -> u32 {
    69
}

fn default_radius() -> f32 {
    70.0
}

fn default_smoothness() -> f32 {
    2.0
}

fn default_margin() -> u32 {
    50
}

fn default_legend_width() -> u32 {
    80
}

fn default_trail_length() -> usize {
    10
}

fn default_value_max() -> f32 {
    DEFAULT_VALUE_MAX
}

fn default_target_rate_hz() -> f64 {
    DEFAULT_TARGET_RATE_HZ
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            grid_width: default_grid_width(),
            grid_height: default_grid_height(),
            radius: default_radius(),
            smoothness: default_smoothness(),
            margin: default_margin(),
            legend_width: default_legend_width(),
            trail_length: default_trail_length(),
            value_max: default_value_max(),
            target_rate_hz: default_target_rate_hz(),
        }
    }
}

impl PipelineConfig {
    /// Check that the renderer can work with these parameters
    pub fn validate(&self) -> Result<()> {
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err(GaitVisError::Configuration(format!(
                "radius must be positive, got {}",
                self.radius
            )));
        }
        if !self.smoothness.is_finite() || self.smoothness <= 0.0 {
            return Err(GaitVisError::Configuration(format!(
                "smoothness must be positive, got {}",
                self.smoothness
            )));
        }
        if self.grid_width == 0 || self.grid_height == 0 {
            return Err(GaitVisError::Configuration(format!(
                "grid dimensions must be positive, got {}x{}",
                self.grid_width, self.grid_height
            )));
        }
        if self.width == 0 || self.height == 0 {
            return Err(GaitVisError::Configuration(format!(
                "heatmap dimensions must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if !self.value_max.is_finite() || self.value_max <= 0.0 {
            return Err(GaitVisError::Configuration(format!(
                "value range must be positive, got {}",
                self.value_max
            )));
        }
        let cells = self.grid_width as u64 * self.grid_height as u64;
        if cells > MAX_GRID_CELLS {
            return Err(GaitVisError::Configuration(format!(
                "grid {}x{} exceeds {} cells",
                self.grid_width, self.grid_height, MAX_GRID_CELLS
            )));
        }
        let fits = self
            .checked_output_size()
            .is_some_and(|(w, h)| w as u64 * h as u64 <= MAX_OUTPUT_PIXELS);
        if !fits {
            return Err(GaitVisError::Configuration(format!(
                "output image exceeds {} pixels (size {}x{}, margin {}, legend {})",
                MAX_OUTPUT_PIXELS, self.width, self.height, self.margin, self.legend_width
            )));
        }
        if self.trail_length > MAX_TRAIL_LENGTH {
            return Err(GaitVisError::Configuration(format!(
                "trail length must be at most {}, got {}",
                MAX_TRAIL_LENGTH, self.trail_length
            )));
        }
        Ok(())
    }

    /// Size of the composited image: two panels, three margins and the legend
    ///
    /// Saturates instead of overflowing; exact for any config that passes
    /// [`validate`](Self::validate).
    pub fn output_size(&self) -> (u32, u32) {
        self.checked_output_size().unwrap_or((u32::MAX, u32::MAX))
    }

    /// [`output_size`](Self::output_size), or `None` if it overflows `u32`
    pub fn checked_output_size(&self) -> Option<(u32, u32)> {
        let width = self
            .width
            .checked_mul(2)?
            .checked_add(self.margin.checked_mul(3)?)?
            .checked_add(self.legend_width)?;
        let height = self.height.checked_add(self.margin.checked_mul(2)?)?;
        Some((width, height))
    }

    /// Builder-style setter for the per-side heatmap size
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Builder-style setter for the interpolation grid
    pub fn with_grid(mut self, grid_width: u32, grid_height: u32) -> Self {
        self.grid_width = grid_width;
        self.grid_height = grid_height;
        self
    }
}

/// Partial update of a [`PipelineConfig`]
///
/// Fields left as `None` keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smoothness: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legend_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trail_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_max: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_rate_hz: Option<f64>,
}

impl ConfigPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn radius(mut self, radius: f32) -> Self {
        self.radius = Some(radius);
        self
    }

    pub fn smoothness(mut self, smoothness: f32) -> Self {
        self.smoothness = Some(smoothness);
        self
    }

    pub fn grid(mut self, grid_width: u32, grid_height: u32) -> Self {
        self.grid_width = Some(grid_width);
        self.grid_height = Some(grid_height);
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn margin(mut self, margin: u32) -> Self {
        self.margin = Some(margin);
        self
    }

    pub fn legend_width(mut self, legend_width: u32) -> Self {
        self.legend_width = Some(legend_width);
        self
    }

    pub fn trail_length(mut self, trail_length: usize) -> Self {
        self.trail_length = Some(trail_length);
        self
    }

    pub fn value_max(mut self, value_max: f32) -> Self {
        self.value_max = Some(value_max);
        self
    }

    pub fn target_rate_hz(mut self, hz: f64) -> Self {
        self.target_rate_hz = Some(hz);
        self
    }

    /// Whether the patch changes nothing
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Produce a new config with this patch applied on top of `base`
    ///
    /// The result is not validated; the target rate is clamped.
    pub fn apply(&self, base: &PipelineConfig) -> PipelineConfig {
        PipelineConfig {
            width: self.width.unwrap_or(base.width),
            height: self.height.unwrap_or(base.height),
            grid_width: self.grid_width.unwrap_or(base.grid_width),
            grid_height: self.grid_height.unwrap_or(base.grid_height),
            radius: self.radius.unwrap_or(base.radius),
            smoothness: self.smoothness.unwrap_or(base.smoothness),
            margin: self.margin.unwrap_or(base.margin),
            legend_width: self.legend_width.unwrap_or(base.legend_width),
            trail_length: self.trail_length.unwrap_or(base.trail_length),
            value_max: self.value_max.unwrap_or(base.value_max),
            target_rate_hz: clamp_rate(self.target_rate_hz.unwrap_or(base.target_rate_hz)),
        }
    }
}

/// How the effective frame count is derived from two sequences of different length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FrameCountPolicy {
    /// `N = min(N_left, N_right)`; the longer side is truncated
    #[default]
    Shortest,
    /// `N = max(N_left, N_right)`; the shorter side wraps around its own length
    Longest,
}

impl FrameCountPolicy {
    /// Effective frame count for the given side lengths
    ///
    /// A side without frames is ignored, so a one-sided dataset still plays.
    pub fn effective_count(&self, left: usize, right: usize) -> usize {
        match (left, right) {
            (0, n) | (n, 0) => n,
            (l, r) => match self {
                FrameCountPolicy::Shortest => l.min(r),
                FrameCountPolicy::Longest => l.max(r),
            },
        }
    }
}

impl std::fmt::Display for FrameCountPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameCountPolicy::Shortest => write!(f, "Shortest"),
            FrameCountPolicy::Longest => write!(f, "Longest"),
        }
    }
}

/// Playback parameters fixed at controller construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Capacity of the pre-render buffer
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,

    /// Reconciliation of left/right sequence lengths
    #[serde(default)]
    pub frame_count_policy: FrameCountPolicy,

    /// Largest forward jump a seek may make without clearing the trails
    #[serde(default = "default_trail_reset_gap")]
    pub trail_reset_gap: usize,

    /// Interval between rate reports in milliseconds
    #[serde(default = "default_rate_report_interval_ms")]
    pub rate_report_interval_ms: u64,

    /// Consecutive over-budget renders before a stall is reported
    #[serde(default = "default_stall_streak")]
    pub stall_streak: u32,

    /// Capacity of each subscriber's event queue
    #[serde(default = "default_event_queue_capacity")]
    pub event_queue_capacity: usize,

    /// Follow the external clock from the first start
    #[serde(default)]
    pub start_in_sync: bool,
}

fn default_buffer_capacity() -> usize {
    DEFAULT_BUFFER_CAPACITY
}

fn default_trail_reset_gap() -> usize {
    4
}

fn default_rate_report_interval_ms() -> u64 {
    1000
}

fn default_stall_streak() -> u32 {
    5
}

fn default_event_queue_capacity() -> usize {
    64
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: default_buffer_capacity(),
            frame_count_policy: FrameCountPolicy::default(),
            trail_reset_gap: default_trail_reset_gap(),
            rate_report_interval_ms: default_rate_report_interval_ms(),
            stall_streak: default_stall_streak(),
            event_queue_capacity: default_event_queue_capacity(),
            start_in_sync: false,
        }
    }
}

impl PlaybackConfig {
    pub fn rate_report_interval(&self) -> Duration {
        Duration::from_millis(self.rate_report_interval_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.grid_width, 20);
        assert_eq!(config.grid_height, 69);
        assert_eq!(config.trail_length, 10);
    }

    #[test]
    fn test_validate_rejects_bad_kernel() {
        let mut config = PipelineConfig {
            radius: 0.0,
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().is_configuration());

        config.radius = 10.0;
        config.smoothness = -1.0;
        assert!(config.validate().is_err());

        config.smoothness = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_grid() {
        let config = PipelineConfig::default().with_grid(0, 10);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("grid"));
    }

    #[test]
    fn test_patch_applies_only_set_fields() {
        let base = PipelineConfig::default();
        let patched = ConfigPatch::new().radius(30.0).trail_length(3).apply(&base);
        assert_eq!(patched.radius, 30.0);
        assert_eq!(patched.trail_length, 3);
        assert_eq!(patched.smoothness, base.smoothness);
        assert_eq!(patched.grid_width, base.grid_width);
    }

    #[test]
    fn test_patch_clamps_rate() {
        let base = PipelineConfig::default();
        assert_eq!(ConfigPatch::new().target_rate_hz(500.0).apply(&base).target_rate_hz, 120.0);
        assert_eq!(ConfigPatch::new().target_rate_hz(0.0).apply(&base).target_rate_hz, 1.0);
        assert!(ConfigPatch::new().is_empty());
    }

    #[test]
    fn test_output_size() {
        let config = PipelineConfig::default();
        assert_eq!(config.output_size(), (175 * 2 + 150 + 80, 520 + 100));
    }

    #[test]
    fn test_validate_rejects_oversized_output() {
        let overflowing = ConfigPatch::new().margin(u32::MAX / 2).apply(&PipelineConfig::default());
        assert_eq!(overflowing.checked_output_size(), None);
        assert_eq!(overflowing.output_size(), (u32::MAX, u32::MAX));
        assert!(overflowing.validate().unwrap_err().is_configuration());

        // Fits in u32 but not in the pixel budget
        let huge = PipelineConfig::default().with_size(20_000, 20_000);
        assert!(huge.checked_output_size().is_some());
        assert!(huge.validate().is_err());

        let wide_legend = ConfigPatch::new().legend_width(u32::MAX).apply(&PipelineConfig::default());
        assert!(wide_legend.validate().is_err());

        let largest = PipelineConfig {
            width: 2000,
            height: 4000,
            margin: 0,
            legend_width: 96,
            ..Default::default()
        };
        assert!(largest.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_oversized_grid_and_trail() {
        let grid = PipelineConfig::default().with_grid(u32::MAX, u32::MAX);
        assert!(grid.validate().unwrap_err().to_string().contains("grid"));

        let trail = ConfigPatch::new().trail_length(usize::MAX).apply(&PipelineConfig::default());
        assert!(trail.validate().unwrap_err().to_string().contains("trail"));
    }

    #[test]
    fn test_frame_count_policy() {
        assert_eq!(FrameCountPolicy::Shortest.effective_count(500, 480), 480);
        assert_eq!(FrameCountPolicy::Longest.effective_count(500, 480), 500);
        assert_eq!(FrameCountPolicy::Shortest.effective_count(0, 480), 480);
        assert_eq!(FrameCountPolicy::Longest.effective_count(0, 0), 0);
    }

    #[test]
    fn test_config_roundtrips_through_toml() {
        let config = PipelineConfig {
            radius: 55.5,
            ..Default::default()
        };
        let text = toml::to_string(&config).unwrap();
        let parsed: PipelineConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed: PlaybackConfig = toml::from_str("buffer_capacity = 4").unwrap();
        assert_eq!(parsed.buffer_capacity, 4);
        assert_eq!(parsed.frame_count_policy, FrameCountPolicy::Shortest);
        assert_eq!(parsed.trail_reset_gap, 4);
    }
}
