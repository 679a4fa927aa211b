//! Temporal accumulation: renders the scene with sub-pixel jitter and blends
//! it into a persistent buffer, alternating between accumulating and holding.

use nightfog_core::effects;
use nightfog_core::{jitter_offset, AccumulationSchedule, AccumulationState, ShaderRegistry};

use crate::error::{RenderError, RenderResult};
use crate::fullscreen::{FullscreenPipeline, UniformBlock};
use crate::gpu::GpuContext;
use crate::pass::{Pass, PassContext};
use crate::render_target::{RenderTarget, TARGET_FORMAT};

/// Samples the scene itself; the input target is ignored.
///
/// While accumulating, the jittered frame is blended into the accumulation
/// target with weight `alpha`. While holding, the accumulation target is
/// shown unchanged. A fresh accumulation target is seeded with the first
/// frame rendered into it.
pub struct TemporalAccumulationPass {
    enabled: bool,
    schedule: AccumulationSchedule,
    blend: FullscreenPipeline,
    uniforms: UniformBlock,
    current: RenderTarget,
    /// Set while a recorded frame awaits submission.
    recorded: bool,
}

impl TemporalAccumulationPass {
    pub fn new(
        gpu: &GpuContext,
        registry: &ShaderRegistry,
        window: u32,
        alpha: f32,
        width: u32,
        height: u32,
    ) -> RenderResult<Self> {
        let blend = FullscreenPipeline::new(gpu, registry.get(effects::TAA_BLEND)?, TARGET_FORMAT)?;
        let mut uniforms = blend.create_uniforms(gpu);
        uniforms.set("alpha", alpha)?;
        Ok(Self {
            enabled: true,
            schedule: AccumulationSchedule::new(window),
            blend,
            uniforms,
            current: RenderTarget::new(gpu, width, height, "taa current")?,
            recorded: false,
        })
    }

    pub fn schedule(&self) -> &AccumulationSchedule {
        &self.schedule
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

impl Pass for TemporalAccumulationPass {
    fn name(&self) -> &str {
        "taa"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn set_size(&mut self, gpu: &GpuContext, width: u32, height: u32) -> RenderResult<()> {
        if self.current.size() != (width, height) {
            self.current = RenderTarget::new(gpu, width, height, "taa current")?;
        }
        Ok(())
    }

    fn render(
        &mut self,
        ctx: &mut PassContext<'_>,
        _input: &RenderTarget,
        output: &RenderTarget,
    ) -> RenderResult<()> {
        let (width, height) = output.size();
        ctx.accumulation.get_or_create(ctx.gpu, width, height)?;
        let seeded = ctx.accumulation.is_seeded();
        let state = self.schedule.state();

        {
            let accumulation = ctx
                .accumulation
                .target()
                .ok_or(RenderError::MissingTarget("accumulation"))?;

            match state {
                AccumulationState::Accumulating => {
                    let jitter = jitter_offset(ctx.frame_index, width, height);
                    ctx.scene.prepare(&ctx.gpu.queue, ctx.camera, jitter);
                    ctx.scene.render(ctx.encoder, &self.current.view);
                    if !seeded {
                        self.current.copy_to(ctx.encoder, accumulation);
                    }
                    self.uniforms.flush(&ctx.gpu.queue);
                    let bind_group = self.blend.create_bind_group(
                        ctx.gpu,
                        &[&self.current.view, &accumulation.view],
                        Some(&self.uniforms),
                    )?;
                    self.blend.draw(ctx.encoder, &output.view, &bind_group);
                    output.copy_to(ctx.encoder, accumulation);
                }
                AccumulationState::Holding => {
                    if !seeded {
                        ctx.scene
                            .prepare(&ctx.gpu.queue, ctx.camera, glam::Vec2::ZERO);
                        ctx.scene.render(ctx.encoder, &self.current.view);
                        self.current.copy_to(ctx.encoder, accumulation);
                    }
                    accumulation.copy_to(ctx.encoder, output);
                }
            }
        }

        if !seeded {
            ctx.accumulation.begin_seed();
        }
        self.recorded = true;
        Ok(())
    }

    fn frame_submitted(&mut self) {
        if std::mem::take(&mut self.recorded) {
            self.schedule.advance();
        }
    }
}
