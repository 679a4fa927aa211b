//! Rendering backend for nightfog.
//!
//! This crate provides the wgpu side of the frame:
//! - GPU context setup (windowed and headless)
//! - Off-screen targets and the persistent accumulation buffer
//! - The scene renderer and the pass chain built on top of it
//! - Pixel readback for headless rendering

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
// GPU sizes move between u32, usize and f32 constantly
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::module_name_repetitions)]
// wgpu descriptors are long by nature
#![allow(clippy::too_many_lines)]

pub mod bloom_pass;
pub mod error;
pub mod fullscreen;
pub mod gpu;
pub mod pass;
pub mod pipeline;
pub mod render_target;
pub mod scene;
pub mod scene_pass;
pub mod shader_pass;
pub mod taa_pass;

pub use bloom_pass::BloomPass;
pub use error::{RenderError, RenderResult};
pub use fullscreen::{FullscreenPipeline, UniformBlock};
pub use gpu::{GpuContext, SurfaceTarget};
pub use pass::{Pass, PassContext};
pub use pipeline::{EncodedFrame, PassPipeline};
pub use render_target::{
    quantize_unorm8, read_pixels, read_texels, write_pixels, AccumulationSlot, RenderTarget,
    RenderTargetManager, TARGET_FORMAT,
};
pub use scene::{SceneEnvironment, SceneRenderer};
pub use scene_pass::ScenePass;
pub use shader_pass::{ShaderPass, SizeUniform};
pub use taa_pass::TemporalAccumulationPass;
