//! Multi-scale bloom: threshold, five levels of separable blur, composite.

use nightfog_core::bloom::{level_sizes, KERNEL_RADII, SMOOTH_WIDTH};
use nightfog_core::effects::{self, BLOOM_LEVELS};
use nightfog_core::{PostProcessConfig, ShaderRegistry};

use crate::error::RenderResult;
use crate::fullscreen::{FullscreenPipeline, UniformBlock};
use crate::gpu::GpuContext;
use crate::pass::{Pass, PassContext};
use crate::render_target::{RenderTarget, TARGET_FORMAT};

struct BloomLevel {
    horizontal: RenderTarget,
    vertical: RenderTarget,
    horizontal_uniforms: UniformBlock,
    vertical_uniforms: UniformBlock,
}

/// Adds a blurred copy of the bright parts of the frame back onto it.
pub struct BloomPass {
    enabled: bool,
    high_pass: FullscreenPipeline,
    high_pass_uniforms: UniformBlock,
    blur: FullscreenPipeline,
    composite: FullscreenPipeline,
    composite_uniforms: UniformBlock,
    bright: RenderTarget,
    levels: Vec<BloomLevel>,
}

impl BloomPass {
    pub fn new(
        gpu: &GpuContext,
        registry: &ShaderRegistry,
        post: &PostProcessConfig,
        width: u32,
        height: u32,
    ) -> RenderResult<Self> {
        let high_pass = FullscreenPipeline::new(
            gpu,
            registry.get(effects::LUMINOSITY_HIGH_PASS)?,
            TARGET_FORMAT,
        )?;
        let mut high_pass_uniforms = high_pass.create_uniforms(gpu);
        high_pass_uniforms.set("threshold", post.bloom_threshold)?;
        high_pass_uniforms.set("smooth_width", SMOOTH_WIDTH)?;

        let blur = FullscreenPipeline::new(gpu, registry.get(effects::SEPARABLE_BLUR)?, TARGET_FORMAT)?;

        let composite = FullscreenPipeline::new(
            gpu,
            registry.get(effects::BLOOM_COMPOSITE)?,
            TARGET_FORMAT,
        )?;
        let mut composite_uniforms = composite.create_uniforms(gpu);
        composite_uniforms.set("strength", post.bloom_strength)?;
        composite_uniforms.set("radius", post.bloom_radius)?;

        let (bright, levels) = Self::allocate(gpu, &blur, width, height)?;
        Ok(Self {
            enabled: true,
            high_pass,
            high_pass_uniforms,
            blur,
            composite,
            composite_uniforms,
            bright,
            levels,
        })
    }

    fn allocate(
        gpu: &GpuContext,
        blur: &FullscreenPipeline,
        width: u32,
        height: u32,
    ) -> RenderResult<(RenderTarget, Vec<BloomLevel>)> {
        let sizes = level_sizes(width, height);
        let (w0, h0) = sizes[0];
        let bright = RenderTarget::new(gpu, w0, h0, "bloom bright")?;
        let mut levels = Vec::with_capacity(BLOOM_LEVELS);
        for (i, &(w, h)) in sizes.iter().enumerate() {
            let texel = glam::Vec2::new(1.0 / w as f32, 1.0 / h as f32);
            let kernel = KERNEL_RADII[i] as f32;
            let mut horizontal_uniforms = blur.create_uniforms(gpu);
            horizontal_uniforms.set("direction", glam::Vec2::X)?;
            let mut vertical_uniforms = blur.create_uniforms(gpu);
            vertical_uniforms.set("direction", glam::Vec2::Y)?;
            for block in [&mut horizontal_uniforms, &mut vertical_uniforms] {
                block.set("texel_size", texel)?;
                block.set("kernel_radius", kernel)?;
                block.set("sigma", kernel)?;
            }
            levels.push(BloomLevel {
                horizontal: RenderTarget::new(gpu, w, h, "bloom horizontal")?,
                vertical: RenderTarget::new(gpu, w, h, "bloom vertical")?,
                horizontal_uniforms,
                vertical_uniforms,
            });
        }
        Ok((bright, levels))
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

impl Pass for BloomPass {
    fn name(&self) -> &str {
        "bloom"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn set_size(&mut self, gpu: &GpuContext, width: u32, height: u32) -> RenderResult<()> {
        if self.bright.size() == level_sizes(width, height)[0] {
            return Ok(());
        }
        let (bright, levels) = Self::allocate(gpu, &self.blur, width, height)?;
        self.bright = bright;
        self.levels = levels;
        Ok(())
    }

    fn render(
        &mut self,
        ctx: &mut PassContext<'_>,
        input: &RenderTarget,
        output: &RenderTarget,
    ) -> RenderResult<()> {
        let gpu = ctx.gpu;

        self.high_pass_uniforms.flush(&gpu.queue);
        let bind_group = self.high_pass.create_bind_group(
            gpu,
            &[&input.view],
            Some(&self.high_pass_uniforms),
        )?;
        self.high_pass.draw(ctx.encoder, &self.bright.view, &bind_group);

        for level in &mut self.levels {
            level.horizontal_uniforms.flush(&gpu.queue);
            level.vertical_uniforms.flush(&gpu.queue);
        }
        let mut source = &self.bright;
        for level in &self.levels {
            let horizontal = self.blur.create_bind_group(
                gpu,
                &[&source.view],
                Some(&level.horizontal_uniforms),
            )?;
            self.blur.draw(ctx.encoder, &level.horizontal.view, &horizontal);
            let vertical = self.blur.create_bind_group(
                gpu,
                &[&level.horizontal.view],
                Some(&level.vertical_uniforms),
            )?;
            self.blur.draw(ctx.encoder, &level.vertical.view, &vertical);
            source = &level.vertical;
        }

        self.composite_uniforms.flush(&gpu.queue);
        let mut inputs: Vec<&wgpu::TextureView> = vec![&input.view];
        inputs.extend(self.levels.iter().map(|l| &l.vertical.view));
        let bind_group =
            self.composite
                .create_bind_group(gpu, &inputs, Some(&self.composite_uniforms))?;
        self.composite.draw(ctx.encoder, &output.view, &bind_group);
        Ok(())
    }
}
