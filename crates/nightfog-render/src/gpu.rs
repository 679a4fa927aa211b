//! GPU device setup and the presentation surface.

use std::sync::Arc;

use pollster::FutureExt;

use crate::error::{RenderError, RenderResult};

/// Device and queue shared by every pass.
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_info: wgpu::AdapterInfo,
}

impl GpuContext {
    /// Creates a context without a surface.
    pub async fn new_headless() -> RenderResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..wgpu::InstanceDescriptor::default()
        });
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| RenderError::AdapterCreationFailed)?;
        Self::from_adapter(&adapter, "nightfog device (headless)").await
    }

    /// Creates a context and a configured surface for `window`.
    pub async fn new_windowed(
        window: Arc<winit::window::Window>,
    ) -> RenderResult<(Self, SurfaceTarget)> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..wgpu::InstanceDescriptor::default()
        });
        let surface = instance.create_surface(window.clone())?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| RenderError::AdapterCreationFailed)?;
        let gpu = Self::from_adapter(&adapter, "nightfog device").await?;

        let size = window.inner_size();
        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first())
            .copied()
            .ok_or(RenderError::SurfaceConfigurationFailed)?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&gpu.device, &config);
        Ok((gpu, SurfaceTarget { surface, config }))
    }

    async fn from_adapter(adapter: &wgpu::Adapter, label: &str) -> RenderResult<Self> {
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some(label),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::default(),
                experimental_features: wgpu::ExperimentalFeatures::default(),
            })
            .await?;
        let adapter_info = adapter.get_info();
        log::info!(
            "using {} ({:?}, {:?})",
            adapter_info.name,
            adapter_info.device_type,
            adapter_info.backend
        );
        Ok(Self {
            device,
            queue,
            adapter_info,
        })
    }

    pub fn max_texture_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    /// Runs `create` inside out-of-memory and validation error scopes.
    pub(crate) fn scoped<T>(
        &self,
        create: impl FnOnce(&wgpu::Device) -> T,
    ) -> (T, Option<wgpu::Error>) {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = create(&self.device);
        let validation = self.device.pop_error_scope().block_on();
        let out_of_memory = self.device.pop_error_scope().block_on();
        (value, out_of_memory.or(validation))
    }
}

/// A window surface and its configuration.
pub struct SurfaceTarget {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
}

impl SurfaceTarget {
    pub fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    /// Reconfigures at a new size. Zero sizes are ignored.
    pub fn resize(&mut self, gpu: &GpuContext, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&gpu.device, &self.config);
    }

    /// Acquires the next frame. A lost or outdated surface is reconfigured
    /// and reported so the caller can skip this frame.
    pub fn acquire(&self, gpu: &GpuContext) -> RenderResult<wgpu::SurfaceTexture> {
        match self.surface.get_current_texture() {
            Ok(frame) => Ok(frame),
            Err(wgpu::SurfaceError::Lost) => {
                self.surface.configure(&gpu.device, &self.config);
                Err(RenderError::SurfaceLost)
            }
            Err(wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&gpu.device, &self.config);
                Err(RenderError::SurfaceOutdated)
            }
            Err(wgpu::SurfaceError::OutOfMemory) => Err(RenderError::OutOfMemory),
            Err(wgpu::SurfaceError::Timeout) => Err(RenderError::Timeout),
            Err(_) => Err(RenderError::SurfaceLost),
        }
    }
}
