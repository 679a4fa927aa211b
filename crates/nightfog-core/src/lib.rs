//! Core logic for nightfog.
//!
//! This crate holds everything that does not need a GPU:
//! - [`SceneConfig`] and its sections, loaded once at startup
//! - [`ShaderProgram`] / [`ShaderRegistry`] for full-screen effects
//! - [`ShaderTemplate`] and the [`FogMaterialCompiler`]
//! - the temporal accumulation schedule, bloom weighting, and [`PassPlan`]
//! - frame pacing, camera orbit, procedural geometry and hotspot picking

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]
// Pixel and index math converts between integer and float freely
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
// Options structs legitimately have many boolean flags
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::module_name_repetitions)]

pub mod accumulation;
pub mod bloom;
pub mod camera;
pub mod color;
pub mod config;
pub mod effects;
pub mod error;
pub mod geometry;
pub mod hotspot;
pub mod material;
pub mod orbit;
pub mod pacing;
pub mod pipeline_plan;
pub mod program;
pub mod template;
pub mod uniform;

pub use accumulation::{blend, blend_color, AccumulationSchedule, AccumulationState};
pub use camera::{jitter_offset, Camera};
pub use color::srgb_hex;
pub use config::{
    Appearance, CameraConfig, ClipPlane, Emissive, FogConfig, HotspotConfig, LightingConfig,
    ModelConfig, PostProcessConfig, SceneConfig, MAX_CLIP_PLANES,
};
pub use error::{NightfogError, Result};
pub use geometry::{starfield, MeshData};
pub use hotspot::{pick, Aabb, Hotspot, Ray};
pub use material::{
    apply_plane_fog, plane_fog, FogMaterialCompiler, Material, MaterialInstance, MaterialKey,
    RenderState, Side,
};
pub use orbit::{OrbitInput, OrbitRig};
pub use pacing::FramePacer;
pub use pipeline_plan::{PassKind, PassPlan};
pub use program::{validate_wgsl, ShaderProgram, ShaderRegistry};
pub use template::{InjectionSlot, PatchMode, ShaderTemplate, SlotPatch};
pub use uniform::{UniformKind, UniformLayout, UniformSlot, UniformValue, UniformValues};

// Re-export glam types for convenience
pub use glam::{Mat4, Vec2, Vec3, Vec4};
