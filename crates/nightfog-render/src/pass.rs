//! The pass abstraction shared by every pipeline stage.

use nightfog_core::Camera;

use crate::error::RenderResult;
use crate::gpu::GpuContext;
use crate::render_target::{AccumulationSlot, RenderTarget};
use crate::scene::SceneRenderer;

/// Everything a pass may touch while recording one frame.
pub struct PassContext<'a> {
    pub gpu: &'a GpuContext,
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub scene: &'a SceneRenderer,
    pub camera: &'a Camera,
    /// Executed frames before this one.
    pub frame_index: u64,
    /// The persistent accumulation target. Only the accumulation pass
    /// writes it.
    pub accumulation: &'a mut AccumulationSlot,
}

/// One stage of the frame.
///
/// A pass reads `input` (the previous stage's output) and writes `output`.
/// The two are always different targets.
pub trait Pass {
    fn name(&self) -> &str;

    /// Disabled passes are skipped and do not swap the ping-pong pair.
    fn enabled(&self) -> bool;

    /// Reallocates anything sized to the viewport.
    fn set_size(&mut self, gpu: &GpuContext, width: u32, height: u32) -> RenderResult<()>;

    /// Records this pass.
    fn render(
        &mut self,
        ctx: &mut PassContext<'_>,
        input: &RenderTarget,
        output: &RenderTarget,
    ) -> RenderResult<()>;

    /// Called once the frame this pass recorded has been submitted. Frames
    /// dropped after an error never reach this point, so per-frame state
    /// advances here rather than in [`Pass::render`].
    fn frame_submitted(&mut self) {}
}
