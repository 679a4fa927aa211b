//! Clickable boxes in the scene.

use glam::Vec3;

use crate::config::HotspotConfig;

/// A half-line with a unit direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Axis-aligned box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = size.abs() * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Distance along `ray` to the first intersection, if any. A ray
    /// starting inside hits at 0.
    pub fn intersect(&self, ray: &Ray) -> Option<f32> {
        let inv = ray.direction.recip();
        let t0 = (self.min - ray.origin) * inv;
        let t1 = (self.max - ray.origin) * inv;
        let near = t0.min(t1).max_element();
        let far = t0.max(t1).min_element();
        if near.is_nan() || far.is_nan() || far < near.max(0.0) {
            return None;
        }
        Some(near.max(0.0))
    }
}

/// A box and the link it leads to.
#[derive(Debug, Clone, PartialEq)]
pub struct Hotspot {
    pub bounds: Aabb,
    pub link: String,
}

impl From<&HotspotConfig> for Hotspot {
    fn from(config: &HotspotConfig) -> Self {
        Self {
            bounds: Aabb::from_center_size(config.center, config.size),
            link: config.link.clone(),
        }
    }
}

/// Index and distance of the nearest hotspot hit by `ray`.
pub fn pick(hotspots: &[Hotspot], ray: &Ray) -> Option<(usize, f32)> {
    hotspots
        .iter()
        .enumerate()
        .filter_map(|(i, h)| h.bounds.intersect(ray).map(|t| (i, t)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box(center: Vec3) -> Hotspot {
        Hotspot {
            bounds: Aabb::from_center_size(center, Vec3::ONE),
            link: format!("{center}"),
        }
    }

    #[test]
    fn test_ray_hits_box() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);
        let t = unit_box(Vec3::ZERO).bounds.intersect(&ray).unwrap();
        assert!((t - 4.5).abs() < 1e-5);
    }

    #[test]
    fn test_ray_misses_box() {
        let ray = Ray::new(Vec3::new(0.0, 2.0, -5.0), Vec3::Z);
        assert_eq!(unit_box(Vec3::ZERO).bounds.intersect(&ray), None);
    }

    #[test]
    fn test_box_behind_ray() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::Z);
        assert_eq!(unit_box(Vec3::ZERO).bounds.intersect(&ray), None);
    }

    #[test]
    fn test_pick_nearest() {
        let spots = vec![unit_box(Vec3::new(0.0, 0.0, 4.0)), unit_box(Vec3::new(0.0, 0.0, 1.0))];
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);
        let (index, t) = pick(&spots, &ray).unwrap();
        assert_eq!(index, 1);
        assert!((t - 5.5).abs() < 1e-5);
    }

    #[test]
    fn test_default_hotspots_from_config() {
        let config = crate::SceneConfig::default();
        let spots: Vec<Hotspot> = config.hotspots.iter().map(Hotspot::from).collect();
        let ray = Ray::new(Vec3::new(-1.4, 10.0, 1.45), -Vec3::Y);
        let (index, _) = pick(&spots, &ray).unwrap();
        assert_eq!(spots[index].link, "https://www.google.com");
    }
}
