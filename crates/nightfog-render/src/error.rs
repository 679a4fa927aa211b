//! Rendering error types.

use nightfog_core::NightfogError;
use thiserror::Error;

/// Errors that can occur during rendering operations.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Failed to create wgpu adapter.
    #[error("failed to create graphics adapter")]
    AdapterCreationFailed,

    /// Failed to create wgpu device.
    #[error("failed to create graphics device: {0}")]
    DeviceCreationFailed(#[from] wgpu::RequestDeviceError),

    /// Failed to create surface.
    #[error("failed to create surface: {0}")]
    SurfaceCreationFailed(#[from] wgpu::CreateSurfaceError),

    /// The surface reports no usable format.
    #[error("surface configuration failed")]
    SurfaceConfigurationFailed,

    /// Shader compilation failed.
    #[error("shader compilation failed: {0}")]
    ShaderCompilationFailed(String),

    /// Pipeline creation failed.
    #[error("pipeline creation failed: {0}")]
    PipelineCreationFailed(String),

    /// Texture creation failed.
    #[error("texture creation failed: {0}")]
    TextureCreationFailed(String),

    /// A bind group was requested with the wrong number of inputs.
    #[error("program '{program}' reads {expected} textures, got {actual}")]
    BindingMismatch {
        program: String,
        expected: usize,
        actual: usize,
    },

    /// A pass ran without a target it depends on.
    #[error("render target '{0}' is not allocated")]
    MissingTarget(&'static str),

    /// Surface lost.
    #[error("surface lost")]
    SurfaceLost,

    /// Surface outdated.
    #[error("surface outdated")]
    SurfaceOutdated,

    /// Out of memory.
    #[error("out of memory")]
    OutOfMemory,

    /// Timeout waiting for GPU.
    #[error("timeout waiting for GPU")]
    Timeout,

    /// Mapping a readback buffer failed.
    #[error("buffer map failed")]
    BufferMapFailed,

    /// Error from the GPU-independent layer.
    #[error(transparent)]
    Core(#[from] NightfogError),
}

/// A specialized Result type for rendering operations.
pub type RenderResult<T> = std::result::Result<T, RenderError>;
