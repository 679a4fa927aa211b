//! Per-tick frame scheduling.
//!
//! The display calls [`FrameDriver::tick`] once per refresh. The driver
//! decides whether a frame executes, applies any resize that arrived since
//! the last executed frame, moves the camera along its orbit, and hands
//! the camera to a [`FrameRenderer`]. A failing frame is logged and the
//! loop carries on.

use nightfog_core::{Camera, CameraConfig, FramePacer, OrbitRig};

use crate::error::Result;

/// Something that can draw one frame and follow viewport changes.
pub trait FrameRenderer {
    fn render_frame(&mut self, camera: &Camera) -> Result<()>;

    fn resize(&mut self, width: u32, height: u32) -> Result<()>;
}

/// What happened on one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The pacer skipped this tick.
    Skipped,
    Rendered,
    /// The frame failed; nothing was presented.
    Aborted,
}

pub struct FrameDriver<R> {
    renderer: R,
    pacer: FramePacer,
    orbit: OrbitRig,
    camera: Camera,
    elapsed_ms: f64,
    pending_resize: Option<(u32, u32)>,
    frames_rendered: u64,
}

impl<R: FrameRenderer> FrameDriver<R> {
    pub fn new(
        renderer: R,
        camera: &CameraConfig,
        target_interval_ms: Option<f32>,
        width: u32,
        height: u32,
    ) -> Self {
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        Self {
            renderer,
            pacer: FramePacer::new(target_interval_ms),
            orbit: OrbitRig::from_config(camera),
            camera: Camera::from_config(camera, aspect),
            elapsed_ms: 0.0,
            pending_resize: None,
            frames_rendered: 0,
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn orbit(&self) -> &OrbitRig {
        &self.orbit
    }

    /// Frames that executed successfully.
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Size waiting for the next executed frame.
    pub fn pending_resize(&self) -> Option<(u32, u32)> {
        self.pending_resize
    }

    /// Queues a viewport change for the next executed frame. Zero-sized
    /// requests (minimised windows) are dropped. A failed resize is retried
    /// on the following frame unless a newer request replaces it.
    pub fn request_resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            log::debug!("ignoring zero-sized resize {width}x{height}");
            return;
        }
        self.pending_resize = Some((width, height));
    }

    /// Advances the clock by `delta_ms` and renders if the pacer allows.
    /// `user_angle` replaces the automatic orbit while present.
    pub fn tick(&mut self, delta_ms: f32, user_angle: Option<f32>) -> TickOutcome {
        self.elapsed_ms += f64::from(delta_ms);
        if !self.pacer.should_render(delta_ms) {
            return TickOutcome::Skipped;
        }

        // The request stays queued until it succeeds
        if let Some((width, height)) = self.pending_resize {
            if let Err(e) = self.renderer.resize(width, height) {
                log::error!("resize to {width}x{height} failed: {e}");
                return TickOutcome::Aborted;
            }
            self.pending_resize = None;
            self.camera.aspect = width as f32 / height as f32;
        }

        let elapsed_s = (self.elapsed_ms / 1000.0) as f32;
        self.orbit.update(&mut self.camera, elapsed_s, user_angle);

        match self.renderer.render_frame(&self.camera) {
            Ok(()) => {
                self.frames_rendered += 1;
                TickOutcome::Rendered
            }
            Err(e) => {
                log::error!("frame aborted: {e}");
                TickOutcome::Aborted
            }
        }
    }
}
