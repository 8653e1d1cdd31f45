//! # GaitVis-RS: Pressure Heatmap Animation Pipeline
//!
//! Turns sparse per-frame foot pressure readings into a continuous stream of
//! rendered heatmap images. Frames are produced on a background thread at an
//! independently configurable rate, buffered ahead of display, and can follow
//! an external (video) timeline through proportional frame mapping.
//!
//! ## Architecture
//!
//! - **Heatmap**: Radial-kernel interpolation, jet coloring, center-of-pressure
//!   trails and side-by-side composition ([`heatmap`])
//! - **Pipeline**: Producer thread, pre-render buffer, rate control and sync
//!   behind a single [`PipelineController`] ([`pipeline`])
//! - **Dataset**: Loader for coordinate JSON and sequence CSV files ([`dataset`])
//! - **Frontend**: eframe/egui viewer consuming the pipeline ([`frontend`])
//! - **Communication**: Crossbeam channels for thread-safe event delivery
//!
//! ## Configuration
//!
//! Settings are stored as TOML in the platform-appropriate config directory
//! under `dev.hxyulin.gaitvis-rs`; logs go to the matching data directory.
//!
//! - **Linux**: `~/.config/dev.hxyulin.gaitvis-rs/`
//! - **macOS**: `~/Library/Application Support/dev.hxyulin.gaitvis-rs/`
//! - **Windows**: `%APPDATA%\dev.hxyulin.gaitvis-rs\`
//!
//! ## Example
//!
//! ```ignore
//! use gaitvis_rs::{dataset::Dataset, pipeline::PipelineEvent, AppConfig, PipelineController};
//!
//! let config = AppConfig::load_or_default();
//! let mut controller = PipelineController::new(config.pipeline, config.playback)?;
//! let events = controller.subscribe();
//!
//! let (left, right, layout) = Dataset::load_dir("recordings/walk-01".as_ref())?.into_parts();
//! controller.set_data(left, right, layout)?;
//! controller.start()?;
//!
//! while let Some(event) = events.recv_timeout(std::time::Duration::from_secs(1)) {
//!     if let PipelineEvent::FrameReady(frame) = event {
//!         println!("frame {} ({}x{})", frame.index, frame.width(), frame.height());
//!     }
//! }
//! ```

pub mod app;
pub mod config;
pub mod dataset;
pub mod error;
pub mod frontend;
pub mod heatmap;
pub mod pipeline;
pub mod types;

// Re-export commonly used types
pub use app::HeatmapViewerApp;
pub use config::{AppConfig, ConfigPatch, PipelineConfig, PlaybackConfig};
pub use error::{GaitVisError, Result};
pub use heatmap::HeatmapRenderer;
pub use pipeline::{PipelineController, PipelineEvent};
pub use types::{PlaybackState, RateReport, RenderedImage, SensorFrame, SensorLayout, SensorPoint, Side};
