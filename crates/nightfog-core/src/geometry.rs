//! Triangle meshes and procedural scene geometry.

use glam::{Mat4, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::StarConfig;

/// Indexed triangle mesh with per-vertex normals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Builds a mesh, computing smooth normals when none are given.
    pub fn new(positions: Vec<[f32; 3]>, normals: Option<Vec<[f32; 3]>>, indices: Vec<u32>) -> Self {
        let mut mesh = Self {
            positions,
            normals: Vec::new(),
            indices,
        };
        match normals {
            Some(normals) if normals.len() == mesh.positions.len() => mesh.normals = normals,
            _ => mesh.compute_normals(),
        }
        mesh
    }

    /// UV sphere centred on the origin. Triangles wind counter-clockwise
    /// seen from outside.
    pub fn uv_sphere(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        let width_segments = width_segments.max(3);
        let height_segments = height_segments.max(2);
        let mut positions = Vec::new();
        let mut normals = Vec::new();
        let row = width_segments + 1;

        for iy in 0..=height_segments {
            let v = iy as f32 / height_segments as f32;
            for ix in 0..=width_segments {
                let u = ix as f32 / width_segments as f32;
                let theta = u * std::f32::consts::TAU;
                let phi = v * std::f32::consts::PI;
                let normal = Vec3::new(-theta.cos() * phi.sin(), phi.cos(), theta.sin() * phi.sin());
                positions.push((normal * radius).to_array());
                normals.push(normal.to_array());
            }
        }

        let mut indices = Vec::new();
        for iy in 0..height_segments {
            for ix in 0..width_segments {
                let a = iy * row + ix + 1;
                let b = iy * row + ix;
                let c = (iy + 1) * row + ix;
                let d = (iy + 1) * row + ix + 1;
                if iy != 0 {
                    indices.extend_from_slice(&[a, b, d]);
                }
                if iy != height_segments - 1 {
                    indices.extend_from_slice(&[b, c, d]);
                }
            }
        }

        Self {
            positions,
            normals,
            indices,
        }
    }

    /// Area-weighted vertex normals.
    pub fn compute_normals(&mut self) {
        let mut accum = vec![Vec3::ZERO; self.positions.len()];
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            if a >= accum.len() || b >= accum.len() || c >= accum.len() {
                continue;
            }
            let pa = Vec3::from_array(self.positions[a]);
            let pb = Vec3::from_array(self.positions[b]);
            let pc = Vec3::from_array(self.positions[c]);
            let n = (pb - pa).cross(pc - pa);
            accum[a] += n;
            accum[b] += n;
            accum[c] += n;
        }
        self.normals = accum
            .into_iter()
            .map(|n| n.try_normalize().unwrap_or(Vec3::Y).to_array())
            .collect();
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Axis-aligned bounds after `transform`.
    pub fn bounds(&self, transform: Mat4) -> Option<(Vec3, Vec3)> {
        let mut points = self
            .positions
            .iter()
            .map(|p| transform.transform_point3(Vec3::from_array(*p)));
        let first = points.next()?;
        Some(points.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p))))
    }

    /// Appends another mesh, offsetting its indices.
    pub fn merge(&mut self, other: &MeshData) {
        let base = self.positions.len() as u32;
        self.positions.extend_from_slice(&other.positions);
        self.normals.extend_from_slice(&other.normals);
        self.indices.extend(other.indices.iter().map(|i| i + base));
    }
}

/// Star positions uniformly distributed over a sphere shell, folded into
/// the upper hemisphere and filtered to `[y_min, y_max]`.
pub fn starfield(config: &StarConfig) -> Vec<Vec3> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut stars = Vec::with_capacity(config.count as usize);
    let mut attempts = 0_u64;
    let max_attempts = u64::from(config.count) * 64 + 64;
    while stars.len() < config.count as usize && attempts < max_attempts {
        attempts += 1;
        let u: f32 = rng.gen();
        let v: f32 = rng.gen();
        let theta = (2.0 * u - 1.0).acos();
        let phi = std::f32::consts::TAU * v;
        let star = Vec3::new(
            config.radius * theta.sin() * phi.cos(),
            (config.radius * theta.sin() * phi.sin()).abs(),
            config.radius * theta.cos(),
        );
        if (config.y_min..=config.y_max).contains(&star.y) {
            stars.push(star);
        }
    }
    if stars.len() < config.count as usize {
        log::warn!(
            "placed {} of {} stars inside y range {}..{}",
            stars.len(),
            config.count,
            config.y_min,
            config.y_max
        );
    }
    stars
}
