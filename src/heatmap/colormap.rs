//! Color mapping for normalized pressure values
//!
//! The heatmap uses a jet-style scale (dark blue → cyan → yellow → dark red)
//! so low pressure reads cool and high pressure reads warm. Lookups go
//! through a 256-entry table built once per renderer.

/// Map a normalized value (0.0-1.0) to a jet color
pub fn jet(value: f32) -> [u8; 3] {
    let v = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
    let channel = |offset: f32| {
        let c = (1.5 - (4.0 * v - offset).abs()).clamp(0.0, 1.0);
        (c * 255.0).round() as u8
    };
    [channel(3.0), channel(2.0), channel(1.0)]
}

/// Precomputed 8-bit lookup table for [`jet`]
#[derive(Debug, Clone)]
pub struct ColorLut {
    table: [[u8; 3]; 256],
}

impl Default for ColorLut {
    fn default() -> Self {
        Self::jet()
    }
}

impl ColorLut {
    pub fn jet() -> Self {
        let mut table = [[0u8; 3]; 256];
        for (i, entry) in table.iter_mut().enumerate() {
            *entry = jet(i as f32 / 255.0);
        }
        Self { table }
    }

    /// Color of an 8-bit level
    pub fn color(&self, level: u8) -> [u8; 3] {
        self.table[level as usize]
    }

    /// Quantize `value / value_max` to 8 bits and look up its color
    ///
    /// Values outside `[0, value_max]` are clipped.
    pub fn map(&self, value: f32, value_max: f32) -> [u8; 3] {
        self.color(quantize(value, value_max))
    }
}

/// Clip a reading into `[0, value_max]` and scale it to 0..=255
pub fn quantize(value: f32, value_max: f32) -> u8 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    let scaled = (value.min(value_max) / value_max) * 255.0;
    scaled as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jet_endpoints() {
        // cool end is dark blue, warm end is dark red
        assert_eq!(jet(0.0), [0, 0, 128]);
        assert_eq!(jet(1.0), [128, 0, 0]);
        assert_eq!(jet(0.5), [128, 255, 128]);
    }

    #[test]
    fn test_jet_orders_cool_to_warm() {
        let low = jet(0.1);
        let high = jet(0.9);
        assert!(low[2] > low[0]);
        assert!(high[0] > high[2]);
    }

    #[test]
    fn test_quantize_clips() {
        assert_eq!(quantize(-10.0, 4095.0), 0);
        assert_eq!(quantize(f32::NAN, 4095.0), 0);
        assert_eq!(quantize(4095.0, 4095.0), 255);
        assert_eq!(quantize(100_000.0, 4095.0), 255);
    }

    #[test]
    fn test_lut_matches_function() {
        let lut = ColorLut::jet();
        assert_eq!(lut.color(0), jet(0.0));
        assert_eq!(lut.color(255), jet(1.0));
        assert_eq!(lut.map(4095.0, 4095.0), jet(1.0));
    }
}
