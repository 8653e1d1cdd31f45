//! Radial interpolation kernels
//!
//! Each sensor contributes `exp(-smoothness * d² / radius²)` of its reading to
//! every cell of the interpolation grid, where `d` is the distance from the
//! sensor to the cell center in heatmap pixel space. The weights only depend on
//! the layout and on a handful of config fields, so they are computed once and
//! reused until one of those inputs changes.

use crate::config::PipelineConfig;
use crate::types::{SensorLayout, SensorPoint, Side};

/// Precomputed weights of one side: `sensors` rows of `cells` columns
#[derive(Debug, Clone, PartialEq)]
pub struct SideKernel {
    weights: Vec<f32>,
    sensors: usize,
    cells: usize,
}

impl SideKernel {
    /// Compute the weights for `coords` on the grid described by `config`
    pub fn compute(coords: &[SensorPoint], config: &PipelineConfig) -> Self {
        let grid_w = config.grid_width as usize;
        let grid_h = config.grid_height as usize;
        let cells = grid_w * grid_h;
        let radius2 = config.radius * config.radius;
        let width = config.width as f32;
        let height = config.height as f32;

        let mut weights = Vec::with_capacity(coords.len() * cells);
        for sensor in coords {
            for row in 0..grid_h {
                let gy = (row as f32 + 0.5) / grid_h as f32 * height;
                for col in 0..grid_w {
                    let gx = (col as f32 + 0.5) / grid_w as f32 * width;
                    let dx = gx - sensor.x;
                    let dy = gy - sensor.y;
                    let dist2 = dx * dx + dy * dy;
                    weights.push((-config.smoothness * (dist2 / radius2)).exp());
                }
            }
        }

        Self {
            weights,
            sensors: coords.len(),
            cells,
        }
    }

    pub fn sensors(&self) -> usize {
        self.sensors
    }

    pub fn cells(&self) -> usize {
        self.cells
    }

    /// Weight of `sensor` at grid cell `cell` (row-major)
    pub fn weight(&self, sensor: usize, cell: usize) -> f32 {
        self.weights[sensor * self.cells + cell]
    }

    /// Interpolated pressure field for one frame's readings
    ///
    /// `readings` must hold exactly one value per sensor. Negative readings
    /// contribute nothing.
    pub fn field(&self, readings: &[f32]) -> Vec<f32> {
        let mut field = vec![0.0f32; self.cells];
        for (sensor, &reading) in readings.iter().enumerate().take(self.sensors) {
            if reading <= 0.0 {
                continue;
            }
            let row = &self.weights[sensor * self.cells..(sensor + 1) * self.cells];
            for (cell, w) in field.iter_mut().zip(row) {
                *cell += reading * w;
            }
        }
        field
    }
}

/// The config and layout inputs a kernel was derived from
#[derive(Debug, Clone, PartialEq)]
struct KernelKey {
    radius: f32,
    smoothness: f32,
    grid_width: u32,
    grid_height: u32,
    width: u32,
    height: u32,
    layout: SensorLayout,
}

impl KernelKey {
    fn new(layout: &SensorLayout, config: &PipelineConfig) -> Self {
        Self {
            radius: config.radius,
            smoothness: config.smoothness,
            grid_width: config.grid_width,
            grid_height: config.grid_height,
            width: config.width,
            height: config.height,
            layout: layout.clone(),
        }
    }

    fn matches(&self, layout: &SensorLayout, config: &PipelineConfig) -> bool {
        self.radius == config.radius
            && self.smoothness == config.smoothness
            && self.grid_width == config.grid_width
            && self.grid_height == config.grid_height
            && self.width == config.width
            && self.height == config.height
            && self.layout == *layout
    }
}

/// Lazily recomputed kernels for both sides
#[derive(Debug, Default)]
pub struct KernelCache {
    key: Option<KernelKey>,
    left: Option<SideKernel>,
    right: Option<SideKernel>,
    rebuilds: u64,
}

impl KernelCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure the cached kernels match `layout` and `config`
    pub fn ensure(&mut self, layout: &SensorLayout, config: &PipelineConfig) {
        if let Some(key) = &self.key {
            if key.matches(layout, config) {
                return;
            }
        }

        tracing::debug!(
            radius = config.radius,
            smoothness = config.smoothness,
            grid_width = config.grid_width,
            grid_height = config.grid_height,
            "Rebuilding interpolation kernels"
        );
        self.left = Some(SideKernel::compute(&layout.left, config));
        self.right = Some(SideKernel::compute(&layout.right, config));
        self.key = Some(KernelKey::new(layout, config));
        self.rebuilds += 1;
    }

    /// Kernel of one side, if [`ensure`](Self::ensure) has run
    pub fn side(&self, side: Side) -> Option<&SideKernel> {
        match side {
            Side::Left => self.left.as_ref(),
            Side::Right => self.right.as_ref(),
        }
    }

    /// Number of times the kernels were (re)built
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> PipelineConfig {
        PipelineConfig::default().with_size(40, 40).with_grid(4, 4)
    }

    #[test]
    fn test_weight_peaks_at_sensor() {
        let config = small_config();
        // Cell (1,1) center is at (15, 15)
        let kernel = SideKernel::compute(&[SensorPoint::new(15.0, 15.0)], &config);
        assert_eq!(kernel.cells(), 16);
        assert!((kernel.weight(0, 5) - 1.0).abs() < 1e-6);
        assert!(kernel.weight(0, 15) < kernel.weight(0, 5));
    }

    #[test]
    fn test_field_is_linear_in_readings() {
        let config = small_config();
        let kernel = SideKernel::compute(
            &[SensorPoint::new(5.0, 5.0), SensorPoint::new(35.0, 35.0)],
            &config,
        );
        let single = kernel.field(&[100.0, 0.0]);
        let double = kernel.field(&[200.0, 0.0]);
        for (a, b) in single.iter().zip(&double) {
            assert!((a * 2.0 - b).abs() < 1e-3);
        }
    }

    #[test]
    fn test_field_ignores_negative_readings() {
        let config = small_config();
        let kernel = SideKernel::compute(&[SensorPoint::new(5.0, 5.0)], &config);
        assert!(kernel.field(&[-50.0]).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_cache_rebuilds_only_on_change() {
        let layout = SensorLayout::new(vec![SensorPoint::new(5.0, 5.0)], vec![]);
        let mut config = small_config();
        let mut cache = KernelCache::new();

        cache.ensure(&layout, &config);
        cache.ensure(&layout, &config);
        assert_eq!(cache.rebuilds(), 1);

        // Fields the kernel doesn't depend on don't invalidate it
        config.margin = 3;
        config.trail_length = 2;
        cache.ensure(&layout, &config);
        assert_eq!(cache.rebuilds(), 1);

        config.radius = 12.0;
        cache.ensure(&layout, &config);
        assert_eq!(cache.rebuilds(), 2);
        assert_eq!(cache.side(Side::Left).map(|k| k.sensors()), Some(1));
        assert_eq!(cache.side(Side::Right).map(|k| k.sensors()), Some(0));
    }
}
