//! Application error types.

use std::path::PathBuf;

use nightfog_core::NightfogError;
use nightfog_render::RenderError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] NightfogError),

    #[error(transparent)]
    Render(#[from] RenderError),

    /// An OBJ file could not be parsed.
    #[error("failed to load model {path}: {source}")]
    ModelLoad {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },

    /// The asset worker stopped before reporting every model.
    #[error("asset loader exited early")]
    LoaderDisconnected,

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("pixel buffer does not match {width}x{height}")]
    InvalidImageData { width: u32, height: u32 },

    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
