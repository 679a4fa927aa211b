//! Camera orbit: automatic spin and pointer-driven spin.

use glam::Vec3;

use crate::camera::Camera;
use crate::config::CameraConfig;

/// Places the camera on the horizontal ellipse through its initial position.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitRig {
    initial: Vec3,
    look_at: Vec3,
    auto_spin_rate: f32,
}

impl OrbitRig {
    pub fn from_config(config: &CameraConfig) -> Self {
        Self {
            initial: config.initial_position,
            look_at: config.look_at,
            auto_spin_rate: config.auto_spin_rate,
        }
    }

    /// Orbit angle of the automatic spin after `elapsed_s` seconds.
    pub fn auto_angle(&self, elapsed_s: f32) -> f32 {
        elapsed_s * self.auto_spin_rate
    }

    pub fn position_at(&self, angle: f32) -> Vec3 {
        Vec3::new(
            self.initial.x * angle.cos(),
            self.initial.y,
            self.initial.z * angle.sin(),
        )
    }

    /// Angle on the ellipse closest to `position`.
    pub fn angle_of(&self, position: Vec3) -> f32 {
        let x = if self.initial.x == 0.0 { position.x } else { position.x / self.initial.x };
        let z = if self.initial.z == 0.0 { position.z } else { position.z / self.initial.z };
        z.atan2(x)
    }

    /// Moves `camera` for this frame. A user angle, when present, replaces
    /// the automatic one.
    pub fn update(&self, camera: &mut Camera, elapsed_s: f32, user_angle: Option<f32>) {
        let angle = user_angle.unwrap_or_else(|| self.auto_angle(elapsed_s));
        camera.position = self.position_at(angle);
        camera.target = self.look_at;
    }
}

/// Pointer state feeding a user orbit angle.
///
/// Each interaction restarts a cooldown; when it runs out the user angle is
/// dropped and the automatic orbit takes over again.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitInput {
    enabled: bool,
    sensitivity: f32,
    cooldown_ms: f32,
    dragging: bool,
    last_x: f32,
    angle: f32,
    user_spun: bool,
    cooldown_remaining_ms: Option<f32>,
}

impl OrbitInput {
    pub fn from_config(config: &CameraConfig) -> Self {
        Self {
            enabled: config.enable_horizontal_spin,
            sensitivity: config.drag_sensitivity,
            cooldown_ms: config.spin_cooldown_ms,
            dragging: false,
            last_x: 0.0,
            angle: 0.0,
            user_spun: false,
            cooldown_remaining_ms: None,
        }
    }

    /// Starts a drag at pixel column `x`, picking up from `current_angle`.
    pub fn pointer_down(&mut self, x: f32, current_angle: f32) {
        if !self.enabled {
            return;
        }
        self.dragging = true;
        self.last_x = x;
        self.angle = current_angle;
        self.user_spun = true;
        self.restart_cooldown();
    }

    pub fn pointer_moved(&mut self, x: f32) {
        if !self.enabled || !self.dragging {
            return;
        }
        let delta = x - self.last_x;
        if delta != 0.0 {
            self.user_spun = true;
        }
        self.angle += delta * self.sensitivity;
        self.last_x = x;
        self.restart_cooldown();
    }

    pub fn pointer_up(&mut self) {
        self.dragging = false;
        self.restart_cooldown();
    }

    /// Advances the cooldown clock.
    pub fn advance(&mut self, delta_ms: f32) {
        if let Some(remaining) = self.cooldown_remaining_ms.as_mut() {
            *remaining -= delta_ms;
            if *remaining <= 0.0 {
                self.cooldown_remaining_ms = None;
                self.user_spun = false;
            }
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// The user's orbit angle while the user spin is active.
    pub fn user_orbit_angle(&self) -> Option<f32> {
        (self.enabled && self.user_spun).then_some(self.angle)
    }

    fn restart_cooldown(&mut self) {
        self.cooldown_remaining_ms = Some(self.cooldown_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CameraConfig {
        CameraConfig::default()
    }

    #[test]
    fn test_auto_orbit_follows_elapsed_time() {
        let rig = OrbitRig::from_config(&config());
        let mut camera = Camera::from_config(&config(), 1.0);
        rig.update(&mut camera, 0.0, None);
        assert!((camera.position - Vec3::new(10.0, 3.0, 0.0)).length() < 1e-5);
        rig.update(&mut camera, 10.0 * std::f32::consts::FRAC_PI_2, None);
        assert!((camera.position - Vec3::new(0.0, 3.0, 10.0)).length() < 1e-4);
    }

    #[test]
    fn test_user_angle_takes_over() {
        let rig = OrbitRig::from_config(&config());
        let mut camera = Camera::from_config(&config(), 1.0);
        rig.update(&mut camera, 123.0, Some(std::f32::consts::PI));
        assert!((camera.position - Vec3::new(-10.0, 3.0, 0.0)).length() < 1e-4);
        assert_eq!(camera.target, config().look_at);
    }

    #[test]
    fn test_angle_of_inverts_position() {
        let rig = OrbitRig::from_config(&config());
        let angle = 0.7;
        assert!((rig.angle_of(rig.position_at(angle)) - angle).abs() < 1e-5);
    }

    #[test]
    fn test_drag_accumulates_angle() {
        let mut input = OrbitInput::from_config(&config());
        assert_eq!(input.user_orbit_angle(), None);
        input.pointer_down(100.0, 1.0);
        input.pointer_moved(110.0);
        input.pointer_moved(130.0);
        let angle = input.user_orbit_angle().unwrap();
        assert!((angle - (1.0 + 30.0 * 0.05)).abs() < 1e-5);
    }

    #[test]
    fn test_cooldown_expires() {
        let mut input = OrbitInput::from_config(&config());
        input.pointer_down(0.0, 0.0);
        input.pointer_up();
        input.advance(999.0);
        assert!(input.user_orbit_angle().is_some());
        input.advance(1.0);
        assert_eq!(input.user_orbit_angle(), None);
    }

    #[test]
    fn test_interaction_restarts_cooldown() {
        let mut input = OrbitInput::from_config(&config());
        input.pointer_down(0.0, 0.0);
        input.advance(800.0);
        input.pointer_moved(5.0);
        input.advance(800.0);
        assert!(input.user_orbit_angle().is_some());
    }

    #[test]
    fn test_moves_without_drag_are_ignored() {
        let mut input = OrbitInput::from_config(&config());
        input.pointer_moved(50.0);
        assert_eq!(input.user_orbit_angle(), None);
    }

    #[test]
    fn test_disabled_spin() {
        let mut input = OrbitInput::from_config(&CameraConfig {
            enable_horizontal_spin: false,
            ..config()
        });
        input.pointer_down(0.0, 0.0);
        input.pointer_moved(10.0);
        assert_eq!(input.user_orbit_angle(), None);
    }
}
