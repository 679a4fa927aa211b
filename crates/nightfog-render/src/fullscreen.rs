//! Full-screen triangle pipelines built from [`ShaderProgram`] declarations.

use std::sync::Arc;

use nightfog_core::{ShaderProgram, UniformValue, UniformValues};
use wgpu::util::DeviceExt;

use crate::error::{RenderError, RenderResult};
use crate::gpu::GpuContext;

/// A compiled full-screen program for one output format.
pub struct FullscreenPipeline {
    program: Arc<ShaderProgram>,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
}

impl FullscreenPipeline {
    pub fn new(
        gpu: &GpuContext,
        program: Arc<ShaderProgram>,
        format: wgpu::TextureFormat,
    ) -> RenderResult<Self> {
        let id = program.id().to_string();
        let source = program.module_source();
        let (shader, error) = gpu.scoped(|device| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(&id),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            })
        });
        if let Some(error) = error {
            return Err(RenderError::ShaderCompilationFailed(format!("{id}: {error}")));
        }

        let mut entries = vec![wgpu::BindGroupLayoutEntry {
            binding: ShaderProgram::sampler_binding(),
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        }];
        for i in 0..program.textures().len() {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: ShaderProgram::texture_binding(i),
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            });
        }
        if let Some(binding) = program.uniform_binding() {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            });
        }

        let device = &gpu.device;
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&id),
            entries: &entries,
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&id),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let (pipeline, error) = gpu.scoped(|device| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(&id),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        });
        if let Some(error) = error {
            return Err(RenderError::PipelineCreationFailed(format!("{id}: {error}")));
        }

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&id),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            ..Default::default()
        });

        log::debug!("built full-screen pipeline '{id}' for {format:?}");
        Ok(Self {
            program,
            pipeline,
            bind_group_layout,
            sampler,
        })
    }

    pub fn program(&self) -> &ShaderProgram {
        &self.program
    }

    /// A uniform block holding the program's defaults.
    pub fn create_uniforms(&self, gpu: &GpuContext) -> UniformBlock {
        UniformBlock::new(gpu, &self.program)
    }

    /// Binds `inputs` to the program's textures in declaration order.
    pub fn create_bind_group(
        &self,
        gpu: &GpuContext,
        inputs: &[&wgpu::TextureView],
        uniforms: Option<&UniformBlock>,
    ) -> RenderResult<wgpu::BindGroup> {
        let expected = self.program.textures().len();
        if inputs.len() != expected {
            return Err(RenderError::BindingMismatch {
                program: self.program.id().to_string(),
                expected,
                actual: inputs.len(),
            });
        }
        let mut entries = vec![wgpu::BindGroupEntry {
            binding: ShaderProgram::sampler_binding(),
            resource: wgpu::BindingResource::Sampler(&self.sampler),
        }];
        for (i, view) in inputs.iter().enumerate() {
            entries.push(wgpu::BindGroupEntry {
                binding: ShaderProgram::texture_binding(i),
                resource: wgpu::BindingResource::TextureView(view),
            });
        }
        if let Some(binding) = self.program.uniform_binding() {
            let block = uniforms
                .and_then(|u| u.buffer.as_ref())
                .ok_or(RenderError::MissingTarget("uniform block"))?;
            entries.push(wgpu::BindGroupEntry {
                binding,
                resource: block.as_entire_binding(),
            });
        }
        Ok(gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(self.program.id()),
            layout: &self.bind_group_layout,
            entries: &entries,
        }))
    }

    /// Draws the full-screen triangle into `output`.
    pub fn draw(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        output: &wgpu::TextureView,
        bind_group: &wgpu::BindGroup,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(self.program.id()),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: output,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            ..Default::default()
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

/// Host values and GPU buffer for one program's `Params` block.
///
/// Queue writes land at submit time, so two draws of the same program in
/// one frame need two blocks.
pub struct UniformBlock {
    values: UniformValues,
    buffer: Option<wgpu::Buffer>,
    dirty: bool,
}

impl UniformBlock {
    fn new(gpu: &GpuContext, program: &ShaderProgram) -> Self {
        let values = program.default_values();
        let buffer = (!values.layout().is_empty()).then(|| {
            gpu.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(program.id()),
                    contents: &values.pack_bytes(),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                })
        });
        Self {
            values,
            buffer,
            dirty: false,
        }
    }

    /// Sets a value. Unchanged values do not mark the block dirty.
    pub fn set(&mut self, name: &str, value: impl Into<UniformValue>) -> RenderResult<()> {
        let value = value.into();
        if self.values.get(name) == Some(value) {
            return Ok(());
        }
        self.values.set(name, value)?;
        self.dirty = true;
        Ok(())
    }

    pub fn values(&self) -> &UniformValues {
        &self.values
    }

    /// Uploads pending changes.
    pub fn flush(&mut self, queue: &wgpu::Queue) {
        if !self.dirty {
            return;
        }
        if let Some(buffer) = &self.buffer {
            queue.write_buffer(buffer, 0, &self.values.pack_bytes());
        }
        self.dirty = false;
    }
}
