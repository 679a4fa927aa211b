//! The ordered pass chain and frame presentation.

use nightfog_core::effects;
use nightfog_core::{Camera, PassKind, PassPlan, SceneConfig, ShaderRegistry};

use crate::bloom_pass::BloomPass;
use crate::error::RenderResult;
use crate::fullscreen::FullscreenPipeline;
use crate::gpu::GpuContext;
use crate::pass::{Pass, PassContext};
use crate::render_target::{RenderTarget, RenderTargetManager};
use crate::scene::SceneRenderer;
use crate::scene_pass::ScenePass;
use crate::shader_pass::{ShaderPass, SizeUniform};
use crate::taa_pass::TemporalAccumulationPass;

/// A frame whose passes are recorded but not yet submitted.
pub struct EncodedFrame {
    encoder: wgpu::CommandEncoder,
    final_index: usize,
}

/// Runs the passes in order over a ping-pong pair of targets.
///
/// Each enabled pass reads the target the previous enabled pass wrote and
/// writes the other one. Passes are fixed after construction.
pub struct PassPipeline {
    scene: SceneRenderer,
    passes: Vec<Box<dyn Pass>>,
    targets: RenderTargetManager,
    blit: Option<FullscreenPipeline>,
    frame_index: u64,
}

impl PassPipeline {
    /// Builds the chain `config` plans. `display_format` is the surface
    /// format frames are presented to, if any.
    pub fn new(
        gpu: &GpuContext,
        config: &SceneConfig,
        scene: SceneRenderer,
        display_format: Option<wgpu::TextureFormat>,
        width: u32,
        height: u32,
    ) -> RenderResult<Self> {
        let registry = ShaderRegistry::with_builtin_effects()?;
        let post = &config.post;
        let plan = PassPlan::new(post);

        let mut passes: Vec<Box<dyn Pass>> = Vec::with_capacity(plan.passes().len());
        for planned in plan.passes() {
            let pass: Box<dyn Pass> = match planned.kind {
                PassKind::Scene => Box::new(ScenePass::new(planned.enabled)),
                PassKind::Fxaa => Box::new(
                    ShaderPass::new(gpu, registry.get(effects::FXAA)?)?.with_size_uniform(
                        "inverse_resolution",
                        SizeUniform::InverseResolution,
                        width,
                        height,
                    )?,
                ),
                PassKind::TemporalAccumulation => Box::new(TemporalAccumulationPass::new(
                    gpu,
                    &registry,
                    post.taa_accumulation_window,
                    post.taa_alpha,
                    width,
                    height,
                )?),
                PassKind::Bloom => Box::new(BloomPass::new(gpu, &registry, post, width, height)?),
                PassKind::Blur => Box::new(
                    ShaderPass::new(gpu, registry.get(effects::BLUR)?)?
                        .with_uniform("radius", post.blur_radius)?
                        .with_size_uniform("resolution", SizeUniform::Resolution, width, height)?,
                ),
                PassKind::FogTint => Box::new(
                    ShaderPass::new(gpu, registry.get(effects::FOG_TINT)?)?
                        .with_uniform("fog_color", config.fog.color)?
                        .with_uniform("plane_fog", post.fog_tint_visibility)?,
                ),
                PassKind::NightTint => Box::new(
                    ShaderPass::new(gpu, registry.get(effects::NIGHT_TINT)?)?
                        .with_uniform("amount", post.night_amount)?,
                ),
            };
            passes.push(pass);
        }
        log::info!("pass pipeline: {plan}");
        Self::with_passes(gpu, scene, passes, display_format, width, height)
    }

    /// Builds a pipeline from explicit passes.
    pub fn with_passes(
        gpu: &GpuContext,
        scene: SceneRenderer,
        passes: Vec<Box<dyn Pass>>,
        display_format: Option<wgpu::TextureFormat>,
        width: u32,
        height: u32,
    ) -> RenderResult<Self> {
        let blit = match display_format {
            Some(format) => {
                let copy = ShaderRegistry::with_builtin_effects()?.get(effects::COPY)?;
                Some(FullscreenPipeline::new(gpu, copy, format)?)
            }
            None => None,
        };
        Ok(Self {
            scene,
            passes,
            targets: RenderTargetManager::new(gpu, width.max(1), height.max(1))?,
            blit,
            frame_index: 0,
        })
    }

    pub fn scene(&self) -> &SceneRenderer {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut SceneRenderer {
        &mut self.scene
    }

    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    pub fn targets(&self) -> &RenderTargetManager {
        &self.targets
    }

    /// Executed frames so far.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Resizes every target and pass. Zero or unchanged sizes are ignored.
    pub fn resize(&mut self, gpu: &GpuContext, width: u32, height: u32) -> RenderResult<()> {
        if width == 0 || height == 0 || self.targets.size() == (width, height) {
            return Ok(());
        }
        // The shared targets carry the committed size, so they change last.
        // A failure before that leaves the old size and a retry runs again.
        self.scene.resize(gpu, width, height)?;
        for pass in &mut self.passes {
            pass.set_size(gpu, width, height)?;
        }
        self.targets.resize(gpu, width, height)?;
        log::debug!("pipeline resized to {width}x{height}");
        Ok(())
    }

    /// Records every enabled pass. Nothing is submitted.
    pub fn encode(&mut self, gpu: &GpuContext, camera: &Camera) -> RenderResult<EncodedFrame> {
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame encoder"),
            });
        let mut read = 0;
        for pass in &mut self.passes {
            if !pass.enabled() {
                continue;
            }
            let (input, output, accumulation) = self.targets.split(read);
            let mut ctx = PassContext {
                gpu,
                encoder: &mut encoder,
                scene: &self.scene,
                camera,
                frame_index: self.frame_index,
                accumulation,
            };
            pass.render(&mut ctx, input, output)?;
            read ^= 1;
        }
        Ok(EncodedFrame {
            encoder,
            final_index: read,
        })
    }

    /// Submits the off-screen work without presenting it.
    pub fn submit(&mut self, gpu: &GpuContext, frame: EncodedFrame) -> &RenderTarget {
        let final_index = frame.final_index;
        gpu.queue.submit(std::iter::once(frame.encoder.finish()));
        self.commit_frame();
        self.targets.transient(final_index)
    }

    /// Copies the final target into `view` and submits.
    pub fn present(
        &mut self,
        gpu: &GpuContext,
        mut frame: EncodedFrame,
        view: &wgpu::TextureView,
    ) -> RenderResult<()> {
        let blit = self
            .blit
            .as_ref()
            .ok_or(crate::error::RenderError::MissingTarget("display"))?;
        let source = self.targets.transient(frame.final_index);
        let bind_group = blit.create_bind_group(gpu, &[&source.view], None)?;
        blit.draw(&mut frame.encoder, view, &bind_group);
        gpu.queue.submit(std::iter::once(frame.encoder.finish()));
        self.commit_frame();
        Ok(())
    }

    /// Advances per-frame state once a frame has reached the queue.
    fn commit_frame(&mut self) {
        self.frame_index += 1;
        self.targets.accumulation_mut().commit_seed();
        for pass in &mut self.passes {
            if pass.enabled() {
                pass.frame_submitted();
            }
        }
    }

    /// Encodes and submits one frame, returning the final target.
    pub fn render_offscreen(
        &mut self,
        gpu: &GpuContext,
        camera: &Camera,
    ) -> RenderResult<&RenderTarget> {
        let frame = self.encode(gpu, camera)?;
        Ok(self.submit(gpu, frame))
    }
}
