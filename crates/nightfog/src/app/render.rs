use std::sync::Arc;

use winit::window::Window;

use nightfog_core::{Camera, SceneConfig};
use nightfog_render::{GpuContext, PassPipeline, SurfaceTarget};

use crate::assets::LoadedModel;
use crate::driver::FrameRenderer;
use crate::error::Result;
use crate::scene_builder::build_scene;

/// Renders into a window surface.
pub struct WindowRenderer {
    gpu: GpuContext,
    surface: SurfaceTarget,
    pipeline: PassPipeline,
}

impl WindowRenderer {
    pub async fn new(
        window: Arc<Window>,
        config: &SceneConfig,
        models: &[LoadedModel],
    ) -> Result<Self> {
        let (gpu, surface) = GpuContext::new_windowed(window).await?;
        let (width, height) = surface.size();
        let scene = build_scene(&gpu, config, models, width, height)?;
        let pipeline =
            PassPipeline::new(&gpu, config, scene, Some(surface.format()), width, height)?;
        Ok(Self {
            gpu,
            surface,
            pipeline,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        self.surface.size()
    }
}

impl FrameRenderer for WindowRenderer {
    fn render_frame(&mut self, camera: &Camera) -> Result<()> {
        let frame = self.pipeline.encode(&self.gpu, camera)?;
        let output = match self.surface.acquire(&self.gpu) {
            Ok(output) => output,
            Err(e) => {
                // Keep the accumulation target in step with the frame counter
                self.pipeline.submit(&self.gpu, frame);
                return Err(e.into());
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.pipeline.present(&self.gpu, frame, &view)?;
        output.present();
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.surface.resize(&self.gpu, width, height);
        self.pipeline.resize(&self.gpu, width, height)?;
        Ok(())
    }
}
