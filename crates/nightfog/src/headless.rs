//! Headless rendering API.
//!
//! Renders frames without opening a window. Useful for integration tests
//! and for producing stills of a configuration.

use std::path::Path;

use image::{ImageBuffer, Rgba};
use nightfog_core::color::linear_to_srgb;
use nightfog_core::{Camera, SceneConfig};
use nightfog_render::{quantize_unorm8, read_texels, GpuContext, PassPipeline};
use pollster::FutureExt;

use crate::assets::LoadedModel;
use crate::driver::FrameRenderer;
use crate::error::{AppError, Result};
use crate::scene_builder::build_scene;

/// Off-screen renderer that keeps the last frame's pixels.
pub struct HeadlessRenderer {
    gpu: GpuContext,
    pipeline: PassPipeline,
    pixels: Vec<u8>,
}

impl HeadlessRenderer {
    pub fn new(
        config: &SceneConfig,
        models: &[LoadedModel],
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let gpu = GpuContext::new_headless().block_on()?;
        Self::with_gpu(gpu, config, models, width, height)
    }

    pub fn with_gpu(
        gpu: GpuContext,
        config: &SceneConfig,
        models: &[LoadedModel],
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let scene = build_scene(&gpu, config, models, width, height)?;
        let pipeline = PassPipeline::new(&gpu, config, scene, None, width, height)?;
        Ok(Self {
            gpu,
            pipeline,
            pixels: Vec::new(),
        })
    }

    pub fn pipeline(&self) -> &PassPipeline {
        &self.pipeline
    }

    /// RGBA8 pixels of the last rendered frame, sRGB encoded.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn size(&self) -> (u32, u32) {
        self.pipeline.targets().size()
    }
}

impl FrameRenderer for HeadlessRenderer {
    fn render_frame(&mut self, camera: &Camera) -> Result<()> {
        let target = self.pipeline.render_offscreen(&self.gpu, camera)?;
        let texels = read_texels(&self.gpu, target)?;
        self.pixels = encode_srgb(&texels);
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.pipeline.resize(&self.gpu, width, height)?;
        Ok(())
    }
}

/// Quantizes linear RGBA floats to sRGB-encoded RGBA8. Alpha stays linear.
fn encode_srgb(texels: &[f32]) -> Vec<u8> {
    texels
        .chunks_exact(4)
        .flat_map(|px| {
            [
                quantize_unorm8(linear_to_srgb(px[0].clamp(0.0, 1.0))),
                quantize_unorm8(linear_to_srgb(px[1].clamp(0.0, 1.0))),
                quantize_unorm8(linear_to_srgb(px[2].clamp(0.0, 1.0))),
                quantize_unorm8(px[3]),
            ]
        })
        .collect()
}

/// Renders one frame of `config` and returns its RGBA8 pixels.
///
/// The camera sits at its configured starting point. The buffer holds
/// `width * height * 4` bytes, row by row from the top left.
pub fn render_to_image(
    config: &SceneConfig,
    models: &[LoadedModel],
    width: u32,
    height: u32,
) -> Result<Vec<u8>> {
    let mut renderer = HeadlessRenderer::new(config, models, width, height)?;
    let camera = Camera::from_config(&config.camera, width as f32 / height.max(1) as f32);
    renderer.render_frame(&camera)?;
    Ok(std::mem::take(&mut renderer.pixels))
}

/// Renders one frame of `config` and saves it as PNG or JPEG.
pub fn render_to_file(
    path: impl AsRef<Path>,
    config: &SceneConfig,
    models: &[LoadedModel],
    width: u32,
    height: u32,
) -> Result<()> {
    let data = render_to_image(config, models, width, height)?;
    save_image(path.as_ref(), &data, width, height)
}

/// Writes RGBA8 pixels to `path`; the format follows the extension.
pub fn save_image(path: &Path, data: &[u8], width: u32, height: u32) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let img: ImageBuffer<Rgba<u8>, Vec<u8>> = ImageBuffer::from_raw(width, height, data.to_vec())
        .ok_or(AppError::InvalidImageData { width, height })?;

    match extension.as_str() {
        "png" => img.save_with_format(path, image::ImageFormat::Png)?,
        "jpg" | "jpeg" => {
            // JPEG has no alpha channel
            let rgb = image::DynamicImage::ImageRgba8(img).to_rgb8();
            rgb.save_with_format(path, image::ImageFormat::Jpeg)?;
        }
        _ => return Err(AppError::UnsupportedFormat(extension)),
    }
    log::info!("saved {}x{} image to {}", width, height, path.display());
    Ok(())
}
