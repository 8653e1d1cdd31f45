//! Core data types for GaitVis-RS
//!
//! This module contains the fundamental data structures shared by the
//! dataset loader, the heatmap renderer and the animation pipeline.
//!
//! # Main Types
//!
//! - [`Side`] - Left or right foot
//! - [`SensorPoint`] - A 2-D position in heatmap pixel space
//! - [`SensorFrame`] - One sample of all sensor readings of one side
//! - [`SensorLayout`] - Sensor coordinates for both sides, fixed per session
//! - [`RenderedImage`] - A composited heatmap frame ready for display
//! - [`PlaybackState`] - Lifecycle state of the frame producer
//! - [`RateReport`] - Measured production rate reported to the consumer

use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Which foot a sensor array belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Both sides, in composition order
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

/// A 2-D point in the pixel space of one side's heatmap
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SensorPoint {
    pub x: f32,
    pub y: f32,
}

impl SensorPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// One sample of every sensor reading on one side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorFrame {
    /// Position of this sample in its side's sequence
    pub index: usize,
    /// One reading per sensor, in layout order
    pub readings: Vec<f32>,
}

impl SensorFrame {
    pub fn new(index: usize, readings: Vec<f32>) -> Self {
        Self { index, readings }
    }

    /// Build a whole side's sequence from raw rows, numbering frames in order
    pub fn sequence(rows: Vec<Vec<f32>>) -> Vec<SensorFrame> {
        rows.into_iter()
            .enumerate()
            .map(|(index, readings)| SensorFrame { index, readings })
            .collect()
    }
}

/// Sensor coordinates for both sides
///
/// Coordinates are expressed in the pixel space of a single side's heatmap
/// (`PipelineConfig::width` x `PipelineConfig::height`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorLayout {
    pub left: Vec<SensorPoint>,
    pub right: Vec<SensorPoint>,
}

impl SensorLayout {
    pub fn new(left: Vec<SensorPoint>, right: Vec<SensorPoint>) -> Self {
        Self { left, right }
    }

    /// Coordinates of one side
    pub fn side(&self, side: Side) -> &[SensorPoint] {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    /// Number of sensors on one side
    pub fn sensor_count(&self, side: Side) -> usize {
        self.side(side).len()
    }
}

/// A composited heatmap frame
///
/// Images are shared with consumers behind an `Arc` and are never mutated
/// after the renderer returns them.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedImage {
    /// Frame index this image represents
    pub index: usize,
    /// Dataset generation the frame was rendered from
    pub session: u64,
    /// RGB8 pixel data
    pub pixels: RgbImage,
}

impl RenderedImage {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Raw RGB bytes, row-major
    pub fn as_rgb_bytes(&self) -> &[u8] {
        self.pixels.as_raw()
    }
}

/// Lifecycle state of the frame producer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// Never started
    #[default]
    Idle,
    /// Producer thread alive and advancing
    Running,
    /// Producer thread alive, advancement halted
    Paused,
    /// Producer thread joined; `start` spawns a fresh one
    Stopped,
}

impl PlaybackState {
    /// Whether a producer thread is currently alive
    pub fn is_active(&self) -> bool {
        matches!(self, PlaybackState::Running | PlaybackState::Paused)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, PlaybackState::Running)
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, PlaybackState::Paused)
    }

    /// Display name for the state
    pub fn display_name(&self) -> &'static str {
        match self {
            PlaybackState::Idle => "Idle",
            PlaybackState::Running => "Running",
            PlaybackState::Paused => "Paused",
            PlaybackState::Stopped => "Stopped",
        }
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Production rate report sent from the producer to subscribers
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RateReport {
    /// Sliding-window average of actual production rate in Hz
    pub measured_hz: f64,
    /// Currently requested rate in Hz
    pub target_hz: f64,
    /// Average render time over the report window in microseconds
    pub avg_render_time_us: f64,
    /// Total frames produced since the producer last started
    pub frames_rendered: u64,
    /// Events evicted because a subscriber queue was full
    pub dropped_events: u64,
    /// Renders are consistently exceeding the rate budget
    pub stalled: bool,
}

impl RateReport {
    /// Achieved rate as a fraction of the requested one
    pub fn efficiency(&self) -> f64 {
        if self.target_hz <= 0.0 {
            0.0
        } else {
            self.measured_hz / self.target_hz
        }
    }
}
