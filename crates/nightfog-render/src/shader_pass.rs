//! A single full-screen program applied to the previous stage's output.

use std::sync::Arc;

use glam::Vec2;
use nightfog_core::{ShaderProgram, UniformValue};

use crate::error::RenderResult;
use crate::fullscreen::{FullscreenPipeline, UniformBlock};
use crate::gpu::GpuContext;
use crate::pass::{Pass, PassContext};
use crate::render_target::{RenderTarget, TARGET_FORMAT};

/// How a uniform follows the viewport size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeUniform {
    /// `(width, height)` in pixels.
    Resolution,
    /// `(1 / width, 1 / height)`.
    InverseResolution,
}

impl SizeUniform {
    fn value(self, width: u32, height: u32) -> Vec2 {
        let size = Vec2::new(width.max(1) as f32, height.max(1) as f32);
        match self {
            Self::Resolution => size,
            Self::InverseResolution => size.recip(),
        }
    }
}

/// Runs one program with a single `t_diffuse`-style input.
pub struct ShaderPass {
    name: String,
    enabled: bool,
    pipeline: FullscreenPipeline,
    uniforms: UniformBlock,
    size_uniform: Option<(String, SizeUniform)>,
}

impl ShaderPass {
    pub fn new(gpu: &GpuContext, program: Arc<ShaderProgram>) -> RenderResult<Self> {
        let name = program.id().to_string();
        let pipeline = FullscreenPipeline::new(gpu, program, TARGET_FORMAT)?;
        let uniforms = pipeline.create_uniforms(gpu);
        Ok(Self {
            name,
            enabled: true,
            pipeline,
            uniforms,
            size_uniform: None,
        })
    }

    /// Overrides a uniform's default.
    pub fn with_uniform(mut self, name: &str, value: impl Into<UniformValue>) -> RenderResult<Self> {
        self.uniforms.set(name, value)?;
        Ok(self)
    }

    /// Keeps `name` in step with the viewport size.
    pub fn with_size_uniform(
        mut self,
        name: &str,
        mode: SizeUniform,
        width: u32,
        height: u32,
    ) -> RenderResult<Self> {
        self.uniforms.set(name, mode.value(width, height))?;
        self.size_uniform = Some((name.to_string(), mode));
        Ok(self)
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn set_uniform(&mut self, name: &str, value: impl Into<UniformValue>) -> RenderResult<()> {
        self.uniforms.set(name, value)
    }

    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.uniforms.values().get(name)
    }
}

impl Pass for ShaderPass {
    fn name(&self) -> &str {
        &self.name
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn set_size(&mut self, _gpu: &GpuContext, width: u32, height: u32) -> RenderResult<()> {
        if let Some((name, mode)) = &self.size_uniform {
            self.uniforms.set(name, mode.value(width, height))?;
        }
        Ok(())
    }

    fn render(
        &mut self,
        ctx: &mut PassContext<'_>,
        input: &RenderTarget,
        output: &RenderTarget,
    ) -> RenderResult<()> {
        self.uniforms.flush(&ctx.gpu.queue);
        let bind_group = self
            .pipeline
            .create_bind_group(ctx.gpu, &[&input.view], Some(&self.uniforms))?;
        self.pipeline.draw(ctx.encoder, &output.view, &bind_group);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_uniform_values() {
        assert_eq!(SizeUniform::Resolution.value(640, 480), Vec2::new(640.0, 480.0));
        assert_eq!(
            SizeUniform::InverseResolution.value(4, 2),
            Vec2::new(0.25, 0.5)
        );
        assert_eq!(SizeUniform::Resolution.value(0, 0), Vec2::ONE);
    }
}
