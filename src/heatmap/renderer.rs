//! Frame renderer
//!
//! Turns one pair of sensor frames into a composited RGB image:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ margin                                                   │
//! │   ┌────────┐ margin ┌────────┐ margin ┌──────┐           │
//! │   │  left  │        │ right  │        │legend│           │
//! │   │heatmap │        │heatmap │        │      │           │
//! │   └────────┘        └────────┘        └──────┘           │
//! │ margin                                                   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Each panel is the interpolated pressure field of one side, colored with the
//! jet scale and upsampled from the interpolation grid to the panel size. On
//! top of it the renderer draws the sensor markers with their index, the
//! center-of-pressure trail and the current center of pressure.
//!
//! Rendering is deterministic: the same readings, layout, config and trail
//! snapshot always give the same pixels. The only state kept between calls is
//! the kernel cache, which never changes the output.

use crate::config::PipelineConfig;
use crate::error::{GaitVisError, Result};
use crate::heatmap::colormap::{quantize, ColorLut};
use crate::heatmap::draw::{self, BLACK, BORDER_GRAY, LABEL_GRAY, TRAIL_PINK, WHITE};
use crate::heatmap::kernel::{KernelCache, SideKernel};
use crate::heatmap::trail::TrailState;
use crate::types::{RenderedImage, SensorFrame, SensorLayout, SensorPoint, Side};
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

const MARKER_RADIUS: i32 = 6;
const COP_RADIUS: i32 = 8;
const TRAIL_MIN_RADIUS: f32 = 2.0;
const TRAIL_MAX_RADIUS: f32 = 8.0;
const LEGEND_PAD_LEFT: i32 = 3;
const LEGEND_STRIPE_WIDTH: u32 = 12;
const LEGEND_TICK_LENGTH: i32 = 4;
const LEGEND_DIVISIONS: f32 = 10.0;
const LEGEND_MAX_TICKS: f32 = 50.0;
/// Points beyond this distance from their panel are never visible
const COORD_LIMIT: f32 = 1_000_000.0;

/// The inputs of one render call besides layout, trail and config
#[derive(Debug, Clone, Copy)]
pub struct FrameRequest<'a> {
    pub index: usize,
    pub session: u64,
    pub left: Option<&'a SensorFrame>,
    pub right: Option<&'a SensorFrame>,
}

impl<'a> FrameRequest<'a> {
    pub fn new(index: usize, left: Option<&'a SensorFrame>, right: Option<&'a SensorFrame>) -> Self {
        Self {
            index,
            session: 0,
            left,
            right,
        }
    }

    pub fn with_session(mut self, session: u64) -> Self {
        self.session = session;
        self
    }

    fn frame(&self, side: Side) -> Option<&'a SensorFrame> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }
}

/// Reading-weighted centroid of the sensor coordinates
///
/// Returns `None` when no sensor registers pressure (no contact). Negative
/// readings are treated as zero.
pub fn center_of_pressure(readings: &[f32], coords: &[SensorPoint]) -> Option<SensorPoint> {
    let mut total = 0.0f64;
    let mut sum_x = 0.0f64;
    let mut sum_y = 0.0f64;
    for (reading, point) in readings.iter().zip(coords) {
        if !reading.is_finite() || *reading <= 0.0 {
            continue;
        }
        let w = *reading as f64;
        total += w;
        sum_x += point.x as f64 * w;
        sum_y += point.y as f64 * w;
    }
    if total <= 0.0 {
        return None;
    }
    Some(SensorPoint::new((sum_x / total) as f32, (sum_y / total) as f32))
}

/// Stateless-by-contract heatmap renderer with an internal kernel cache
#[derive(Debug, Default)]
pub struct HeatmapRenderer {
    kernels: KernelCache,
    lut: ColorLut,
}

impl HeatmapRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render one frame
    ///
    /// Appends this frame's centers of pressure to `trail` (bounded by
    /// `config.trail_length`) before drawing it.
    ///
    /// # Errors
    ///
    /// - [`GaitVisError::Configuration`] if `config` fails validation
    /// - [`GaitVisError::DataShape`] if a frame's reading count differs from its layout
    pub fn render(
        &mut self,
        request: FrameRequest<'_>,
        layout: &SensorLayout,
        trail: &mut TrailState,
        config: &PipelineConfig,
    ) -> Result<RenderedImage> {
        config.validate()?;
        for side in Side::BOTH {
            if let Some(frame) = request.frame(side) {
                let expected = layout.sensor_count(side);
                if frame.readings.len() != expected {
                    return Err(GaitVisError::DataShape {
                        side,
                        frame: frame.index,
                        expected,
                        actual: frame.readings.len(),
                    });
                }
            }
        }

        self.kernels.ensure(layout, config);
        trail.set_capacity(config.trail_length);

        let mut panels = Vec::with_capacity(2);
        let mut cops = [None, None];
        for (slot, side) in Side::BOTH.into_iter().enumerate() {
            let frame = request.frame(side);
            let kernel = self.kernels.side(side);
            panels.push(self.render_panel(frame, kernel, config));

            let cop = frame.and_then(|f| center_of_pressure(&f.readings, layout.side(side)));
            if let Some(point) = cop {
                trail.push(side, point);
            }
            cops[slot] = cop;
        }

        let pixels = self.compose(&panels, layout, trail, &cops, config);
        Ok(RenderedImage {
            index: request.index,
            session: request.session,
            pixels,
        })
    }

    /// Colored, upsampled heatmap of one side
    ///
    /// A side without data renders as a black panel.
    fn render_panel(
        &self,
        frame: Option<&SensorFrame>,
        kernel: Option<&SideKernel>,
        config: &PipelineConfig,
    ) -> RgbImage {
        let (frame, kernel) = match (frame, kernel) {
            (Some(f), Some(k)) if k.sensors() > 0 => (f, k),
            _ => return RgbImage::new(config.width, config.height),
        };

        let field = kernel.field(&frame.readings);
        let mut grid = RgbImage::new(config.grid_width, config.grid_height);
        for (pixel, value) in grid.pixels_mut().zip(&field) {
            *pixel = Rgb(self.lut.color(quantize(*value, config.value_max)));
        }

        if grid.dimensions() == (config.width, config.height) {
            return grid;
        }
        imageops::resize(&grid, config.width, config.height, FilterType::Triangle)
    }

    fn compose(
        &self,
        panels: &[RgbImage],
        layout: &SensorLayout,
        trail: &TrailState,
        cops: &[Option<SensorPoint>; 2],
        config: &PipelineConfig,
    ) -> RgbImage {
        let (out_w, out_h) = config.output_size();
        let mut out = RgbImage::from_pixel(out_w, out_h, WHITE);

        let margin = config.margin as i64;
        let top = margin;
        let origins = [margin, margin * 2 + config.width as i64];
        for (panel, x) in panels.iter().zip(origins) {
            imageops::replace(&mut out, panel, x, top);
        }

        let legend_x = origins[1] + config.width as i64 + margin;
        self.draw_legend(&mut out, legend_x as i32, top as i32, config);

        for (slot, side) in Side::BOTH.into_iter().enumerate() {
            let (ox, oy) = (origins[slot] as i32, top as i32);
            draw_sensor_markers(&mut out, layout.side(side), ox, oy);
            draw_trail(&mut out, trail, side, ox, oy);
            if let Some(cop) = cops[slot] {
                let (x, y) = to_pixel(cop, ox, oy);
                draw::fill_circle(&mut out, x, y, COP_RADIUS, TRAIL_PINK, 1.0);
            }
        }

        out
    }

    /// Vertical color scale with tick marks and labels, high values on top
    fn draw_legend(&self, out: &mut RgbImage, x: i32, y: i32, config: &PipelineConfig) {
        if config.legend_width == 0 {
            return;
        }
        let height = config.height as i32;
        let stripe_w = LEGEND_STRIPE_WIDTH.min(config.legend_width) as i32;
        let stripe_x = x + LEGEND_PAD_LEFT;

        for row in 0..height {
            let t = if height > 1 {
                1.0 - row as f32 / (height - 1) as f32
            } else {
                1.0
            };
            let color = Rgb(self.lut.map(t * config.value_max, config.value_max));
            draw::hline(out, stripe_x, stripe_x + stripe_w - 1, y + row, color);
        }
        draw::stroke_rect(out, stripe_x, y, stripe_w, height, BORDER_GRAY);

        let step = tick_step(config.value_max);
        if !step.is_finite() || step <= 0.0 {
            return;
        }
        let ticks = (config.value_max / step).floor().min(LEGEND_MAX_TICKS) as u32;
        let tick_x = stripe_x + stripe_w;
        for n in 0..=ticks {
            let tick = n as f32 * step;
            let ty = y + ((1.0 - tick / config.value_max) * (height - 1) as f32) as i32;
            draw::hline(out, tick_x, tick_x + LEGEND_TICK_LENGTH, ty, BORDER_GRAY);
            draw::draw_number(out, tick_x + LEGEND_TICK_LENGTH + 3, ty - 2, tick as u64, 1, LABEL_GRAY);
        }
    }
}

/// Round tick spacing giving about ten divisions of the value range
fn tick_step(value_max: f32) -> f32 {
    let raw = value_max / LEGEND_DIVISIONS;
    let magnitude = 10f32.powi(raw.log10().floor() as i32);
    let normalized = raw / magnitude;
    let nice = if normalized <= 1.0 {
        1.0
    } else if normalized <= 2.0 {
        2.0
    } else if normalized <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

/// Canvas position of a panel point; far-off points are pinned well outside
/// the canvas so the clipping primitives drop them
fn to_pixel(point: SensorPoint, ox: i32, oy: i32) -> (i32, i32) {
    let pin = |v: f32| {
        if v.is_nan() {
            0
        } else {
            v.clamp(-COORD_LIMIT, COORD_LIMIT).round() as i32
        }
    };
    (pin(point.x).saturating_add(ox), pin(point.y).saturating_add(oy))
}

/// White disc with a black rim at every sensor, labeled with its index
fn draw_sensor_markers(out: &mut RgbImage, coords: &[SensorPoint], ox: i32, oy: i32) {
    for (i, point) in coords.iter().enumerate() {
        let (x, y) = to_pixel(*point, ox, oy);
        draw::fill_circle(out, x, y, MARKER_RADIUS, WHITE, 1.0);
        draw::stroke_circle(out, x, y, MARKER_RADIUS, BLACK);
        let label_w = i.to_string().len() as i32 * draw::GLYPH_ADVANCE - 1;
        draw::draw_number(out, x - label_w / 2, y - 2, i as u64, 1, BLACK);
    }
}

/// Trail points shrink and fade from newest to oldest
fn draw_trail(out: &mut RgbImage, trail: &TrailState, side: Side, ox: i32, oy: i32) {
    let n = trail.len(side);
    if n == 0 {
        return;
    }
    for (age, point) in trail.points(side).rev().enumerate() {
        let freshness = (n - age) as f32 / n as f32;
        let radius = TRAIL_MIN_RADIUS + freshness * (TRAIL_MAX_RADIUS - TRAIL_MIN_RADIUS);
        let alpha = 0.3 + 0.7 * freshness;
        let (x, y) = to_pixel(*point, ox, oy);
        draw::fill_circle(out, x, y, radius as i32, TRAIL_PINK, alpha);
    }
}
