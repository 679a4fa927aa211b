//! nightfog: a fog-shrouded night scene with a layered post-processing
//! pipeline.
//!
//! The scene is a sky dome, a moon, a starfield and a set of OBJ models,
//! all lit by moonlight and cut by a fog plane. Every frame runs through
//! a configurable chain of full-screen passes (FXAA, bloom, temporal
//! accumulation, blur, fog tint, night tint) before it reaches the window.
//!
//! # Quick Start
//!
//! ```no_run
//! use nightfog::*;
//!
//! let config = SceneConfig::default().with_bloom(true);
//! show_with_config(config);
//! ```
//!
//! Without a window:
//!
//! ```no_run
//! use nightfog::*;
//!
//! fn main() -> Result<()> {
//!     let config = SceneConfig::default();
//!     render_to_file("night.png", &config, &[], 800, 600)?;
//!     Ok(())
//! }
//! ```

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
// Pixel math converts between integer and float freely
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::module_name_repetitions)]

mod app;
pub mod assets;
pub mod driver;
pub mod error;
pub mod headless;
pub mod scene_builder;

pub use app::{run_app, App, WindowRenderer};
pub use assets::{load_model, AssetLoader, LoadHandle, LoadedModel};
pub use driver::{FrameDriver, FrameRenderer, TickOutcome};
pub use error::{AppError, Result};
pub use headless::{render_to_file, render_to_image, save_image, HeadlessRenderer};
pub use scene_builder::build_scene;

pub use nightfog_core::{Camera, CameraConfig, PostProcessConfig, SceneConfig};
pub use nightfog_core::{Mat4, Vec2, Vec3, Vec4};

/// Loads the configured models and opens the viewer with the default
/// configuration. Blocks until the window closes.
pub fn show() {
    show_with_config(SceneConfig::default());
}

/// Loads the configured models and opens the viewer.
pub fn show_with_config(config: SceneConfig) {
    let _ = env_logger::try_init();
    let models = match AssetLoader::spawn(config.models.paths()).wait() {
        Ok(models) => models,
        Err(e) => {
            log::error!("{e}");
            Vec::new()
        }
    };
    app::run_app(config, models);
}
