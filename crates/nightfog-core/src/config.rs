//! Scene configuration.
//!
//! [`SceneConfig`] is built once at startup, validated, and then passed by
//! reference to every component. Colors are stored as linear RGB; defaults are
//! authored as sRGB hex and decoded with [`srgb_hex`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::color::srgb_hex;
use crate::error::{NightfogError, Result};

/// Maximum number of clipping planes the surface shader evaluates.
pub const MAX_CLIP_PLANES: usize = 4;

/// Post-processing chain options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostProcessConfig {
    /// Fast approximate antialiasing. Ignored while `taa_enabled` is set.
    pub fxaa: bool,
    pub bloom_enabled: bool,
    pub bloom_strength: f32,
    /// Blend between narrow and wide bloom levels (0..1).
    pub bloom_radius: f32,
    /// Luminance above which pixels bloom.
    pub bloom_threshold: f32,
    /// Temporal accumulation in place of the direct scene pass.
    pub taa_enabled: bool,
    /// Executed frames per accumulate/hold phase.
    pub taa_accumulation_window: u32,
    /// Weight of the new frame in the accumulation blend.
    pub taa_alpha: f32,
    /// Night tint strength; the pass runs when > 0.
    pub night_amount: f32,
    /// Tent blur radius in pixels; the pass runs when > 0.
    pub blur_radius: f32,
    /// `plane_fog` of the full-screen fog composite; the pass runs when < 1.
    pub fog_tint_visibility: f32,
}

impl Default for PostProcessConfig {
    fn default() -> Self {
        Self {
            fxaa: false,
            bloom_enabled: true,
            bloom_strength: 1.0,
            bloom_radius: 0.7,
            bloom_threshold: 0.8,
            taa_enabled: false,
            taa_accumulation_window: 200,
            taa_alpha: 0.1,
            night_amount: 0.0,
            blur_radius: 0.0,
            fog_tint_visibility: 1.0,
        }
    }
}

/// A plane `normal . p + constant = 0`. Points with negative distance are
/// on the clipped side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipPlane {
    pub normal: Vec3,
    pub constant: f32,
}

impl ClipPlane {
    pub fn new(normal: Vec3, constant: f32) -> Self {
        Self { normal, constant }
    }

    /// Positive on the clipped side, matching the shader convention.
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        -(self.normal.dot(point) + self.constant)
    }
}

/// Height fog and scene distance fog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FogConfig {
    pub color: Vec3,
    /// Depth over which plane fog fades in above a clipping plane.
    pub height: f32,
    /// Scene distance fog start.
    pub near: f32,
    /// Scene distance fog end.
    pub far: f32,
    pub clip_planes: Vec<ClipPlane>,
}

impl Default for FogConfig {
    fn default() -> Self {
        Self {
            color: srgb_hex(0x0044_6677),
            height: 1.0,
            near: 1.0,
            far: 3000.0,
            clip_planes: vec![ClipPlane::new(Vec3::Y, 1.5)],
        }
    }
}

/// Camera projection and orbit behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view.
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub initial_position: Vec3,
    pub look_at: Vec3,
    /// Whether pointer drags may take over the orbit.
    pub enable_horizontal_spin: bool,
    /// Automatic orbit speed in radians per second.
    pub auto_spin_rate: f32,
    /// Radians of orbit per pixel of horizontal drag.
    pub drag_sensitivity: f32,
    /// Idle time after the last interaction before the automatic orbit resumes.
    pub spin_cooldown_ms: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 27.0,
            near: 1.0,
            far: 3000.0,
            initial_position: Vec3::new(10.0, 3.0, 10.0),
            look_at: Vec3::new(0.0, 1.0, 0.0),
            enable_horizontal_spin: true,
            auto_spin_rate: 0.1,
            drag_sensitivity: 0.05,
            spin_cooldown_ms: 1000.0,
        }
    }
}

/// A directional light shining from `position` toward the origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionalLightConfig {
    pub color: Vec3,
    pub intensity: f32,
    pub position: Vec3,
}

impl DirectionalLightConfig {
    /// Unit vector from the surface toward the light.
    pub fn direction(&self) -> Vec3 {
        self.position.normalize_or_zero()
    }

    pub fn radiance(&self) -> Vec3 {
        self.color * self.intensity
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    pub ambient_color: Vec3,
    pub ambient_intensity: f32,
    pub key_light: DirectionalLightConfig,
    /// The moon's light; the moon sphere sits at its position.
    pub moonlight: DirectionalLightConfig,
    pub moon_radius: f32,
    pub moon_segments: u32,
}

impl Default for LightingConfig {
    fn default() -> Self {
        let moon = srgb_hex(0x0091_a3b0);
        Self {
            ambient_color: srgb_hex(0x00cc_dbdf),
            ambient_intensity: 0.9,
            key_light: DirectionalLightConfig {
                color: moon,
                intensity: 0.5,
                position: Vec3::new(-2.0, 1.0, 1.0),
            },
            moonlight: DirectionalLightConfig {
                color: moon,
                intensity: 1.0,
                position: Vec3::new(-10.0, 3.0, -10.0),
            },
            moon_radius: 0.9,
            moon_segments: 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkyConfig {
    pub color: Vec3,
    pub radius: f32,
    pub segments: u32,
}

impl Default for SkyConfig {
    fn default() -> Self {
        Self {
            color: srgb_hex(0x0054_6bab),
            radius: 17.0,
            segments: 15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StarConfig {
    pub count: u32,
    /// Radius of the shell the stars sit on.
    pub radius: f32,
    /// World-space billboard size.
    pub size: f32,
    pub color: Vec3,
    pub seed: u64,
    /// Stars outside `[y_min, y_max]` are resampled.
    pub y_min: f32,
    pub y_max: f32,
}

impl Default for StarConfig {
    fn default() -> Self {
        Self {
            count: 1000,
            radius: 15.0,
            size: 0.2,
            color: Vec3::ONE,
            seed: 0x5eed,
            y_min: 0.0,
            y_max: 150.0,
        }
    }
}

/// Emissive glow added on top of lit color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Emissive {
    pub color: Vec3,
    pub intensity: f32,
}

impl Emissive {
    pub fn radiance(&self) -> Vec3 {
        self.color * self.intensity
    }
}

/// Appearance of one loaded mesh.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Appearance {
    pub color: Vec3,
    pub opacity: f32,
    #[serde(default)]
    pub emissive: Option<Emissive>,
}

impl Appearance {
    pub fn new(color: Vec3, opacity: f32) -> Self {
        Self {
            color,
            opacity,
            emissive: None,
        }
    }

    pub fn with_emissive(mut self, color: Vec3, intensity: f32) -> Self {
        self.emissive = Some(Emissive { color, intensity });
        self
    }

    /// Used when a mesh has no entry in the appearance table: opaque mid-blue.
    pub fn fallback() -> Self {
        Self::new(srgb_hex(0x0000_77ff), 1.0)
    }
}

/// Placement shared by every loaded model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelTransform {
    pub scale: Vec3,
    pub rotation_x_degrees: f32,
    pub translation: Vec3,
}

impl ModelTransform {
    pub fn matrix(&self) -> glam::Mat4 {
        glam::Mat4::from_scale_rotation_translation(
            self.scale,
            glam::Quat::from_rotation_x(self.rotation_x_degrees.to_radians()),
            self.translation,
        )
    }
}

impl Default for ModelTransform {
    fn default() -> Self {
        Self {
            scale: Vec3::splat(1.4),
            rotation_x_degrees: -90.0,
            translation: Vec3::new(0.0, -4.0, 0.0),
        }
    }
}

/// Per-mesh placement override keyed by mesh id.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshOverride {
    pub scale: Option<Vec3>,
}

/// Loaded models and their appearance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub asset_dir: PathBuf,
    /// OBJ files relative to `asset_dir`. The file stem is the mesh id and
    /// the list position is the draw order.
    pub files: Vec<String>,
    pub transform: ModelTransform,
    pub appearances: BTreeMap<String, Appearance>,
    pub overrides: BTreeMap<String, MeshOverride>,
}

impl ModelConfig {
    /// Stable id of a model file: its stem.
    pub fn mesh_id(file: &str) -> String {
        Path::new(file)
            .file_stem()
            .map_or_else(|| file.to_string(), |s| s.to_string_lossy().into_owned())
    }

    /// Model matrix for a mesh, with its override applied.
    pub fn model_matrix(&self, mesh_id: &str) -> glam::Mat4 {
        let mut transform = self.transform;
        if let Some(scale) = self.overrides.get(mesh_id).and_then(|o| o.scale) {
            transform.scale = scale;
        }
        transform.matrix()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|f| self.asset_dir.join(f)).collect()
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        let table: [(u32, f32); 17] = [
            (0x0075_4e1a, 1.0), // ground
            (0x0075_4e1a, 1.0),
            (0x0075_4e1a, 1.0),
            (0x002b_4e2a, 1.0), // grass
            (0x0066_665c, 1.0), // walls
            (0x0066_665c, 1.0),
            (0x007e_99a3, 1.0), // roofs
            (0x00ff_ffff, 1.0), // windows
            (0x00ff_ffff, 1.0),
            (0x00ff_ffff, 1.0),
            (0x00b4_b4b4, 1.0), // railings
            (0x00e8_f9ff, 1.0), // greenhouses
            (0x00ff_ffff, 1.0),
            (0x00ff_ffff, 1.0),
            (0x00ff_ffff, 0.5), // clock window
            (0x0086_5110, 1.0), // underground
            (0x00e8_f9ff, 0.8), // water
        ];
        let glowing = [7, 8, 9, 12, 13, 14];
        let appearances = table
            .iter()
            .enumerate()
            .map(|(i, &(hex, opacity))| {
                let mut appearance = Appearance::new(srgb_hex(hex), opacity);
                if glowing.contains(&i) {
                    appearance = appearance.with_emissive(srgb_hex(0x00ff_bb00), 10.0);
                }
                (format!("model_{i}"), appearance)
            })
            .collect();

        let mut overrides = BTreeMap::new();
        overrides.insert(
            "model_15".to_string(),
            MeshOverride {
                scale: Some(Vec3::new(10.0, 10.0, 1.4)),
            },
        );

        Self {
            asset_dir: PathBuf::from("assets/models"),
            files: (0..15).map(|i| format!("model_{i}.obj")).collect(),
            transform: ModelTransform::default(),
            appearances,
            overrides,
        }
    }
}

/// A clickable box and the link it opens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotspotConfig {
    pub center: Vec3,
    pub size: Vec3,
    pub link: String,
}

fn default_hotspots() -> Vec<HotspotConfig> {
    let spots = [
        ([-1.4, 0.8, 1.45], [0.6, 1.6, 0.6], "https://www.google.com"),
        ([1.2, 0.0, 0.2], [1.5, 1.0, 1.5], "https://www.bing.com"),
        ([0.2, 1.4, 0.0], [0.6, 1.7, 0.6], "https://www.duckduckgo.com"),
        ([-1.9, -0.2, 2.0], [1.2, 0.9, 1.2], "https://www.yahoo.com"),
        ([0.5, -0.5, -1.7], [0.3, 1.9, 0.3], "https://www.baidu.com"),
    ];
    spots
        .into_iter()
        .map(|(center, size, link)| HotspotConfig {
            center: Vec3::from_array(center),
            size: Vec3::from_array(size),
            link: link.to_string(),
        })
        .collect()
}

/// Complete scene configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub post: PostProcessConfig,
    pub fog: FogConfig,
    pub camera: CameraConfig,
    pub lighting: LightingConfig,
    pub sky: SkyConfig,
    pub stars: StarConfig,
    pub models: ModelConfig,
    pub hotspots: Vec<HotspotConfig>,
    /// Minimum wall-clock time between executed frames; `None` renders on
    /// every tick.
    pub target_frame_interval_ms: Option<f32>,
    pub background_color: Vec3,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            post: PostProcessConfig::default(),
            fog: FogConfig::default(),
            camera: CameraConfig::default(),
            lighting: LightingConfig::default(),
            sky: SkyConfig::default(),
            stars: StarConfig::default(),
            models: ModelConfig::default(),
            hotspots: default_hotspots(),
            target_frame_interval_ms: None,
            background_color: Vec3::ZERO,
        }
    }
}

impl SceneConfig {
    /// Creates the default (desktop) configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Profile for low-power devices: wider view from further out, fewer
    /// stars, coarser sky, and a 30 fps cap.
    pub fn constrained() -> Self {
        let mut config = Self::default();
        config.camera.fov_degrees = 30.0;
        config.camera.initial_position = Vec3::new(15.0, 3.0, 15.0);
        config.camera.look_at = Vec3::new(0.0, 1.0, 1.5);
        config.post.bloom_radius = 0.5;
        config.fog.height = 1.5;
        config.stars.count = 400;
        config.sky.segments = 8;
        config.target_frame_interval_ms = Some(33.33);
        config
    }

    /// Parses JSON over the defaults and validates the result.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Rejects values the renderer cannot honour.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(NightfogError::InvalidConfig(msg));
        let post = &self.post;
        if !(0.0..=1.0).contains(&post.taa_alpha) {
            return invalid(format!("taa_alpha {} outside [0, 1]", post.taa_alpha));
        }
        if post.taa_accumulation_window == 0 {
            return invalid("taa_accumulation_window must be at least 1".into());
        }
        if !(0.0..=1.0).contains(&post.fog_tint_visibility) {
            return invalid(format!(
                "fog_tint_visibility {} outside [0, 1]",
                post.fog_tint_visibility
            ));
        }
        if post.bloom_strength < 0.0 || post.blur_radius < 0.0 || post.night_amount < 0.0 {
            return invalid("bloom_strength, blur_radius and night_amount must not be negative".into());
        }
        if self.fog.height <= 0.0 {
            return invalid(format!("fog height {} must be positive", self.fog.height));
        }
        if self.fog.clip_planes.len() > MAX_CLIP_PLANES {
            return invalid(format!(
                "{} clip planes given, at most {MAX_CLIP_PLANES} supported",
                self.fog.clip_planes.len()
            ));
        }
        if let Some(interval) = self.target_frame_interval_ms {
            if interval <= 0.0 {
                return invalid(format!("target frame interval {interval} must be positive"));
            }
        }
        let camera = &self.camera;
        if camera.near <= 0.0 || camera.far <= camera.near {
            return invalid(format!(
                "camera range {}..{} is empty",
                camera.near, camera.far
            ));
        }
        if !(1.0..179.0).contains(&camera.fov_degrees) {
            return invalid(format!("fov {} out of range", camera.fov_degrees));
        }
        if self.sky.segments < 3 || self.lighting.moon_segments < 3 {
            return invalid("spheres need at least 3 segments".into());
        }
        Ok(())
    }

    pub fn with_fxaa(mut self, enabled: bool) -> Self {
        self.post.fxaa = enabled;
        self
    }

    pub fn with_bloom(mut self, enabled: bool) -> Self {
        self.post.bloom_enabled = enabled;
        self
    }

    pub fn with_taa(mut self, enabled: bool) -> Self {
        self.post.taa_enabled = enabled;
        self
    }

    pub fn with_taa_alpha(mut self, alpha: f32) -> Self {
        self.post.taa_alpha = alpha;
        self
    }

    pub fn with_accumulation_window(mut self, frames: u32) -> Self {
        self.post.taa_accumulation_window = frames;
        self
    }

    pub fn with_night_amount(mut self, amount: f32) -> Self {
        self.post.night_amount = amount;
        self
    }

    pub fn with_blur_radius(mut self, radius: f32) -> Self {
        self.post.blur_radius = radius;
        self
    }

    pub fn with_fog_tint_visibility(mut self, plane_fog: f32) -> Self {
        self.post.fog_tint_visibility = plane_fog;
        self
    }

    pub fn with_fog_color(mut self, color: Vec3) -> Self {
        self.fog.color = color;
        self
    }

    pub fn with_target_frame_interval(mut self, interval_ms: Option<f32>) -> Self {
        self.target_frame_interval_ms = interval_ms;
        self
    }
}
