//! Configuration module for GaitVis-RS
//!
//! This module handles application configuration including:
//! - Pipeline rendering parameters and playback settings ([`settings`])
//! - Viewer preferences (window size, theme, last dataset directory)
//! - Persistence of all of the above as a TOML file
//!
//! # Config Location
//!
//! The config file lives in the platform-appropriate config directory under
//! `dev.hxyulin.gaitvis-rs`:
//!
//! - **Linux**: `~/.config/dev.hxyulin.gaitvis-rs/gaitvis.toml`
//! - **macOS**: `~/Library/Application Support/dev.hxyulin.gaitvis-rs/gaitvis.toml`
//! - **Windows**: `%APPDATA%\dev.hxyulin.gaitvis-rs\gaitvis.toml`
//!
//! # Example
//!
//! ```ignore
//! use gaitvis_rs::config::AppConfig;
//!
//! let mut config = AppConfig::load_or_default();
//! config.pipeline.radius = 60.0;
//! config.save()?;
//! ```

pub mod settings;

pub use settings::*;

use crate::error::{GaitVisError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for config and data directories
pub const APP_ID: &str = "dev.hxyulin.gaitvis-rs";

/// Config filename
pub const CONFIG_FILE: &str = "gaitvis.toml";

/// Get the application config directory path
pub fn app_config_dir() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID))
}

/// Get the application data directory path (logs)
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Ensure a directory exists, creating it if needed
pub fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| {
            GaitVisError::Config(format!("Failed to create directory {:?}: {}", dir, e))
        })?;
    }
    Ok(())
}

/// Get the path to the config file
pub fn config_path() -> Option<PathBuf> {
    app_config_dir().map(|p| p.join(CONFIG_FILE))
}

// ==================== Viewer Config ====================

/// Preferences of the display window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// Enable dark mode
    #[serde(default = "default_true")]
    pub dark_mode: bool,

    /// Initial window size in logical pixels
    #[serde(default = "default_window_size")]
    pub window_size: [f32; 2],

    /// Dataset directory opened last
    #[serde(default)]
    pub last_dataset_dir: Option<PathBuf>,

    /// Frame rate of the simulated video clock used for sync
    #[serde(default = "default_video_fps")]
    pub video_fps: f64,

    /// Total frames of the simulated video clock
    #[serde(default = "default_video_frames")]
    pub video_total_frames: u64,
}

fn default_true() -> bool {
    true
}

fn default_window_size() -> [f32; 2] {
    [1100.0, 800.0]
}

fn default_video_fps() -> f64 {
    30.0
}

fn default_video_frames() -> u64 {
    900
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            dark_mode: true,
            window_size: default_window_size(),
            last_dataset_dir: None,
            video_fps: default_video_fps(),
            video_total_frames: default_video_frames(),
        }
    }
}

// ==================== App Config ====================

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Rendering parameters and target rate
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Playback settings fixed at controller construction
    #[serde(default)]
    pub playback: PlaybackConfig,

    /// Viewer window preferences
    #[serde(default)]
    pub viewer: ViewerConfig,
}

impl AppConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the config from a specific file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            GaitVisError::Config(format!("Failed to read config {:?}: {}", path, e))
        })?;

        let config: AppConfig = toml::from_str(&content).map_err(|e| {
            GaitVisError::Config(format!("Failed to parse config {:?}: {}", path, e))
        })?;

        config.pipeline.validate().map_err(|e| {
            e.with_context(format!("Invalid pipeline section in {:?}", path))
        })?;

        Ok(config)
    }

    /// Load the config from the default location
    ///
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self> {
        let path = config_path().ok_or_else(|| {
            GaitVisError::Config("Could not determine config path".to_string())
        })?;

        if !path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(path)
    }

    /// Load the config, returning defaults on any error
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save the config to a specific file
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| GaitVisError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            GaitVisError::Config(format!("Failed to write config {:?}: {}", path, e))
        })
    }

    /// Save the config to the default location
    pub fn save(&self) -> Result<()> {
        let path = config_path().ok_or_else(|| {
            GaitVisError::Config("Could not determine config path".to_string())
        })?;
        self.save_to(path)
    }
}
