//! Heatmap rendering
//!
//! Turns sensor readings into composited heatmap images. Everything in this
//! module is synchronous and free of threading concerns; the
//! [`pipeline`](crate::pipeline) module decides when and where frames get
//! rendered.
//!
//! # Main Types
//!
//! - [`HeatmapRenderer`] - Renders one frame pair into a [`RenderedImage`](crate::types::RenderedImage)
//! - [`FrameRequest`] - Index, session and frames of one render call
//! - [`TrailState`] - Bounded center-of-pressure history of both sides
//! - [`KernelCache`] - Interpolation weights reused across frames
//! - [`ColorLut`] - Jet color lookup table

pub mod colormap;
pub mod draw;
pub mod kernel;
pub mod renderer;
pub mod trail;

pub use colormap::{jet, quantize, ColorLut};
pub use kernel::{KernelCache, SideKernel};
pub use renderer::{center_of_pressure, FrameRequest, HeatmapRenderer};
pub use trail::TrailState;
