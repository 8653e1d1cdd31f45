//! Action and control state types for the frontend
//!
//! UI panels never touch the pipeline directly: they read a borrowed
//! snapshot of the control values and return [`ViewerAction`]s, which the
//! app applies to its [`PipelineController`](crate::pipeline::PipelineController)
//! after rendering.

use crate::config::{ConfigPatch, PipelineConfig};
use std::path::PathBuf;

/// Actions that any panel can emit
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerAction {
    /// Start (or resume) playback
    Play,
    Pause,
    Stop,
    /// Move playback to a frame index
    Seek(usize),
    /// Change the production rate in Hz
    SetRate(f64),
    /// Change rendering parameters
    UpdateConfig(ConfigPatch),
    /// Follow the simulated video clock
    SetSync(bool),
    /// Load the dataset in a directory
    LoadDataset(PathBuf),
}

/// Values bound to the toolbar widgets
#[derive(Debug, Clone, PartialEq)]
pub struct ControlState {
    pub rate_hz: f64,
    pub radius: f32,
    pub smoothness: f32,
    pub seek_index: usize,
    pub dataset_input: String,
}

impl ControlState {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            rate_hz: config.target_rate_hz,
            radius: config.radius,
            smoothness: config.smoothness,
            seek_index: 0,
            dataset_input: String::new(),
        }
    }
}
