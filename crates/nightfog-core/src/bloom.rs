//! Bloom level layout and weighting.

/// Blur kernel radius of each bloom level, narrowest first.
pub const KERNEL_RADII: [u32; 5] = [3, 5, 7, 9, 11];

/// Base weight of each level before radius shaping.
pub const LEVEL_FACTORS: [f32; 5] = [1.0, 0.8, 0.6, 0.4, 0.2];

/// Pixels brighter than the threshold fade in over this luminance width.
pub const SMOOTH_WIDTH: f32 = 0.01;

/// Shapes a level factor by the bloom radius: 0 favours narrow levels,
/// 1 favours wide ones.
pub fn level_weight(factor: f32, radius: f32) -> f32 {
    factor + (1.2 - factor - factor) * radius
}

/// Sizes of the five levels: half resolution, then halving again.
pub fn level_sizes(width: u32, height: u32) -> [(u32, u32); 5] {
    let mut w = width.div_ceil(2).max(1);
    let mut h = height.div_ceil(2).max(1);
    let mut sizes = [(1, 1); 5];
    for size in &mut sizes {
        *size = (w, h);
        w = (w / 2).max(1);
        h = (h / 2).max(1);
    }
    sizes
}

/// Rec. 601 luma.
pub fn luminance(rgb: [f32; 3]) -> f32 {
    0.299 * rgb[0] + 0.587 * rgb[1] + 0.114 * rgb[2]
}
