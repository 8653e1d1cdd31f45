//! Raster primitives for the heatmap overlays
//!
//! All primitives clip to the image bounds, so callers can pass coordinates
//! that fall partially or entirely outside the canvas.

use image::{Rgb, RgbImage};

pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
pub const BORDER_GRAY: Rgb<u8> = Rgb([120, 120, 120]);
pub const LABEL_GRAY: Rgb<u8> = Rgb([80, 80, 80]);
pub const TRAIL_PINK: Rgb<u8> = Rgb([255, 105, 203]);

/// 3x5 bitmap glyphs for the digits 0-9, one row per byte, MSB-left in the low 3 bits
const DIGITS: [[u8; 5]; 10] = [
    [0b111, 0b101, 0b101, 0b101, 0b111],
    [0b010, 0b110, 0b010, 0b010, 0b111],
    [0b111, 0b001, 0b111, 0b100, 0b111],
    [0b111, 0b001, 0b111, 0b001, 0b111],
    [0b101, 0b101, 0b111, 0b001, 0b001],
    [0b111, 0b100, 0b111, 0b001, 0b111],
    [0b111, 0b100, 0b111, 0b101, 0b111],
    [0b111, 0b001, 0b001, 0b001, 0b001],
    [0b111, 0b101, 0b111, 0b101, 0b111],
    [0b111, 0b101, 0b111, 0b001, 0b111],
];

/// Width of one glyph including spacing, at scale 1
pub const GLYPH_ADVANCE: i32 = 4;

/// Blend `color` over the pixel at (x, y) with the given opacity
pub fn blend_pixel(img: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>, alpha: f32) {
    if x < 0 || y < 0 || x >= img.width() as i32 || y >= img.height() as i32 {
        return;
    }
    let alpha = alpha.clamp(0.0, 1.0);
    let px = img.get_pixel_mut(x as u32, y as u32);
    if alpha >= 1.0 {
        *px = color;
        return;
    }
    for c in 0..3 {
        let under = px.0[c] as f32;
        let over = color.0[c] as f32;
        px.0[c] = (under + (over - under) * alpha).round() as u8;
    }
}

pub fn set_pixel(img: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>) {
    blend_pixel(img, x, y, color, 1.0);
}

/// Filled disc of radius `r` centered at (cx, cy)
pub fn fill_circle(img: &mut RgbImage, cx: i32, cy: i32, r: i32, color: Rgb<u8>, alpha: f32) {
    if r < 0 {
        return;
    }
    let r2 = r * r;
    for dy in -r..=r {
        for dx in -r..=r {
            if dx * dx + dy * dy <= r2 {
                blend_pixel(img, cx + dx, cy + dy, color, alpha);
            }
        }
    }
}

/// One pixel wide circle outline
pub fn stroke_circle(img: &mut RgbImage, cx: i32, cy: i32, r: i32, color: Rgb<u8>) {
    if r <= 0 {
        set_pixel(img, cx, cy, color);
        return;
    }
    let outer = (r * r) as f32 + r as f32;
    let inner = (r * r) as f32 - r as f32;
    for dy in -r..=r {
        for dx in -r..=r {
            let d2 = (dx * dx + dy * dy) as f32;
            if d2 <= outer && d2 >= inner {
                set_pixel(img, cx + dx, cy + dy, color);
            }
        }
    }
}

pub fn hline(img: &mut RgbImage, x0: i32, x1: i32, y: i32, color: Rgb<u8>) {
    for x in x0.min(x1)..=x0.max(x1) {
        set_pixel(img, x, y, color);
    }
}

pub fn vline(img: &mut RgbImage, x: i32, y0: i32, y1: i32, color: Rgb<u8>) {
    for y in y0.min(y1)..=y0.max(y1) {
        set_pixel(img, x, y, color);
    }
}

/// Rectangle outline covering `w` x `h` pixels from (x, y)
pub fn stroke_rect(img: &mut RgbImage, x: i32, y: i32, w: i32, h: i32, color: Rgb<u8>) {
    if w <= 0 || h <= 0 {
        return;
    }
    hline(img, x, x + w - 1, y, color);
    hline(img, x, x + w - 1, y + h - 1, color);
    vline(img, x, y, y + h - 1, color);
    vline(img, x + w - 1, y, y + h - 1, color);
}

/// Draw a non-negative integer with the built-in digit font
///
/// Returns the horizontal advance in pixels.
pub fn draw_number(img: &mut RgbImage, x: i32, y: i32, value: u64, scale: i32, color: Rgb<u8>) -> i32 {
    let scale = scale.max(1);
    let text = value.to_string();
    let mut pen = x;
    for ch in text.bytes() {
        let glyph = &DIGITS[(ch - b'0') as usize];
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..3 {
                if bits & (0b100 >> col) == 0 {
                    continue;
                }
                for sy in 0..scale {
                    for sx in 0..scale {
                        set_pixel(
                            img,
                            pen + col * scale + sx,
                            y + row as i32 * scale + sy,
                            color,
                        );
                    }
                }
            }
        }
        pen += GLYPH_ADVANCE * scale;
    }
    pen - x
}
