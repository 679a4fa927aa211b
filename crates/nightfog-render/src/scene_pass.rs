//! Rasterizes the scene into the pass output.

use glam::Vec2;

use crate::error::RenderResult;
use crate::gpu::GpuContext;
use crate::pass::{Pass, PassContext};
use crate::render_target::RenderTarget;

/// First stage of every pipeline. Disabled when temporal accumulation
/// samples the scene itself.
pub struct ScenePass {
    enabled: bool,
}

impl ScenePass {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl Pass for ScenePass {
    fn name(&self) -> &str {
        "scene"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn set_size(&mut self, _gpu: &GpuContext, _width: u32, _height: u32) -> RenderResult<()> {
        Ok(())
    }

    fn render(
        &mut self,
        ctx: &mut PassContext<'_>,
        _input: &RenderTarget,
        output: &RenderTarget,
    ) -> RenderResult<()> {
        ctx.scene.prepare(&ctx.gpu.queue, ctx.camera, Vec2::ZERO);
        ctx.scene.render(ctx.encoder, &output.view);
        Ok(())
    }
}
