//! Perspective camera and sub-pixel jitter.

use glam::{Mat4, Vec2, Vec3, Vec4Swizzles};

use crate::config::CameraConfig;
use crate::hotspot::Ray;

/// Samples in one jitter cycle.
pub const JITTER_SAMPLES: u32 = 8;

/// A perspective camera looking at a target point with +Y up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub aspect: f32,
}

impl Camera {
    pub fn from_config(config: &CameraConfig, aspect: f32) -> Self {
        Self {
            position: config.initial_position,
            target: config.look_at,
            fov_y_degrees: config.fov_degrees,
            near: config.near,
            far: config.far,
            aspect,
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    /// Projection into wgpu's `[0, 1]` depth range.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_y_degrees.to_radians(),
            self.aspect,
            self.near,
            self.far,
        )
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// View-projection shifted by `jitter` in normalized device units.
    pub fn jittered_view_projection(&self, jitter: Vec2) -> Mat4 {
        Mat4::from_translation(jitter.extend(0.0)) * self.view_projection()
    }

    /// World-space ray through a point in normalized device coordinates.
    pub fn ray_through(&self, ndc: Vec2) -> Ray {
        let inverse = self.view_projection().inverse();
        let near = inverse * ndc.extend(0.0).extend(1.0);
        let far = inverse * ndc.extend(1.0).extend(1.0);
        let near = near.xyz() / near.w;
        let far = far.xyz() / far.w;
        Ray::new(near, far - near)
    }
}

/// Maps a cursor position in pixels to normalized device coordinates.
pub fn cursor_to_ndc(x: f32, y: f32, width: u32, height: u32) -> Vec2 {
    Vec2::new(
        x / width.max(1) as f32 * 2.0 - 1.0,
        1.0 - y / height.max(1) as f32 * 2.0,
    )
}

/// Radical inverse of `index` in `base`.
pub fn halton(mut index: u32, base: u32) -> f32 {
    let mut f = 1.0;
    let mut result = 0.0;
    while index > 0 {
        f /= base as f32;
        result += f * (index % base) as f32;
        index /= base;
    }
    result
}

/// Sub-pixel offset for `frame`, cycling through a Halton (2, 3) pattern,
/// in normalized device units for a `width` x `height` target.
pub fn jitter_offset(frame: u64, width: u32, height: u32) -> Vec2 {
    let index = (frame % u64::from(JITTER_SAMPLES)) as u32 + 1;
    let pixel = Vec2::new(halton(index, 2), halton(index, 3)) - Vec2::splat(0.5);
    Vec2::new(
        pixel.x * 2.0 / width.max(1) as f32,
        pixel.y * 2.0 / height.max(1) as f32,
    )
}
