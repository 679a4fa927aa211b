//! Color helpers.
//!
//! Scene colors are authored as sRGB hex values and stored as linear RGB, the
//! space lighting and blending happen in.

use glam::Vec3;

/// Converts one sRGB-encoded channel in `[0, 1]` to linear.
pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.040_45 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Converts one linear channel in `[0, 1]` to sRGB encoding.
pub fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

/// Decodes a `0xRRGGBB` sRGB hex value into linear RGB.
pub fn srgb_hex(hex: u32) -> Vec3 {
    let channel = |shift: u32| srgb_to_linear(((hex >> shift) & 0xff) as f32 / 255.0);
    Vec3::new(channel(16), channel(8), channel(0))
}

/// Bit patterns of a color, for exact-match cache keys.
pub fn color_bits(color: Vec3) -> [u32; 3] {
    [color.x.to_bits(), color.y.to_bits(), color.z.to_bits()]
}
