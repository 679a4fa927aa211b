//! Rasterization of the 3D scene: surface materials, the starfield, and the
//! per-frame globals they share.

use std::collections::HashMap;

use glam::{Mat4, Vec2, Vec3, Vec4Swizzles};
use nightfog_core::material::Side;
use nightfog_core::{
    Camera, ClipPlane, MaterialInstance, MaterialKey, MeshData, SceneConfig, MAX_CLIP_PLANES,
};
use wgpu::util::DeviceExt;

use crate::error::{RenderError, RenderResult};
use crate::gpu::GpuContext;
use crate::render_target::TARGET_FORMAT;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

const MAX_LIGHTS: usize = 2;

/// Mirrors `Globals` in the surface and star shaders.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SceneGlobals {
    pub view_proj: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    pub ambient: [f32; 4],
    pub light_directions: [[f32; 4]; MAX_LIGHTS],
    pub light_colors: [[f32; 4]; MAX_LIGHTS],
    pub clip_planes: [[f32; 4]; MAX_CLIP_PLANES],
    pub scene_fog_color: [f32; 4],
    pub scene_fog_range: [f32; 4],
    pub counts: [u32; 4],
}

/// Mirrors `Mesh` in the surface shader.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshUniforms {
    pub model: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
    pub base_color: [f32; 4],
    pub emissive: [f32; 4],
    pub surface: [f32; 4],
}

impl MeshUniforms {
    pub fn new(transform: Mat4, instance: &MaterialInstance) -> Self {
        let material = &instance.material;
        Self {
            model: transform.to_cols_array_2d(),
            normal_matrix: transform.inverse().transpose().to_cols_array_2d(),
            base_color: material.base_color.extend(instance.opacity).to_array(),
            emissive: instance.emissive.extend(0.0).to_array(),
            surface: [
                material.metalness,
                material.roughness,
                instance.depth_offset(),
                0.0,
            ],
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct StarParams {
    color: [f32; 4],
    camera_right: [f32; 4],
    camera_up: [f32; 4],
    size: [f32; 4],
}

/// Lights, clipping planes and distance fog shared by every draw.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneEnvironment {
    pub ambient: Vec3,
    /// (direction toward the light, radiance)
    pub lights: Vec<(Vec3, Vec3)>,
    pub clip_planes: Vec<ClipPlane>,
    pub fog_color: Vec3,
    pub fog_near: f32,
    pub fog_far: f32,
    pub background: Vec3,
}

impl SceneEnvironment {
    pub fn from_config(config: &SceneConfig) -> Self {
        let lighting = &config.lighting;
        Self {
            ambient: lighting.ambient_color * lighting.ambient_intensity,
            lights: [&lighting.key_light, &lighting.moonlight]
                .iter()
                .map(|l| (l.direction(), l.radiance()))
                .collect(),
            clip_planes: config.fog.clip_planes.clone(),
            fog_color: config.fog.color,
            fog_near: config.fog.near,
            fog_far: config.fog.far,
            background: config.background_color,
        }
    }

    /// Packs the globals block for `view_proj` seen from `eye`.
    pub fn globals(&self, view_proj: Mat4, eye: Vec3) -> SceneGlobals {
        let mut globals = SceneGlobals {
            view_proj: view_proj.to_cols_array_2d(),
            camera_position: eye.extend(1.0).to_array(),
            ambient: self.ambient.extend(1.0).to_array(),
            light_directions: [[0.0; 4]; MAX_LIGHTS],
            light_colors: [[0.0; 4]; MAX_LIGHTS],
            clip_planes: [[0.0; 4]; MAX_CLIP_PLANES],
            scene_fog_color: self.fog_color.extend(1.0).to_array(),
            scene_fog_range: [self.fog_near, self.fog_far, 0.0, 0.0],
            counts: [0; 4],
        };
        let lights = self.lights.iter().take(MAX_LIGHTS);
        for (i, (direction, radiance)) in lights.enumerate() {
            globals.light_directions[i] = direction.extend(0.0).to_array();
            globals.light_colors[i] = radiance.extend(1.0).to_array();
            globals.counts[1] += 1;
        }
        let planes = self.clip_planes.iter().take(MAX_CLIP_PLANES);
        for (i, plane) in planes.enumerate() {
            globals.clip_planes[i] = plane.normal.extend(plane.constant).to_array();
            globals.counts[0] += 1;
        }
        globals
    }
}

struct MeshDraw {
    label: String,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    bind_group: wgpu::BindGroup,
    key: MaterialKey,
    transparent: bool,
    draw_order: u32,
}

struct StarDraw {
    instance_buffer: wgpu::Buffer,
    count: u32,
    color: Vec3,
    size: f32,
}

struct DepthTarget {
    view: wgpu::TextureView,
    size: (u32, u32),
}

impl DepthTarget {
    fn new(gpu: &GpuContext, width: u32, height: u32) -> RenderResult<Self> {
        let (texture, error) = gpu.scoped(|device| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some("scene depth"),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: DEPTH_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
        });
        if let Some(error) = error {
            return Err(RenderError::TextureCreationFailed(format!("scene depth: {error}")));
        }
        Ok(Self {
            view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
            size: (width, height),
        })
    }
}

/// Draws the scene into a color target.
pub struct SceneRenderer {
    environment: SceneEnvironment,
    globals_buffer: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,
    globals_layout: wgpu::BindGroupLayout,
    mesh_layout: wgpu::BindGroupLayout,
    fog_mesh_layout: wgpu::BindGroupLayout,
    pipelines: HashMap<MaterialKey, wgpu::RenderPipeline>,
    material_buffers: HashMap<MaterialKey, wgpu::Buffer>,
    draws: Vec<MeshDraw>,
    star_pipeline: wgpu::RenderPipeline,
    star_params_buffer: wgpu::Buffer,
    star_bind_group: wgpu::BindGroup,
    stars: Option<StarDraw>,
    depth: DepthTarget,
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

impl SceneRenderer {
    pub fn new(
        gpu: &GpuContext,
        environment: SceneEnvironment,
        width: u32,
        height: u32,
    ) -> RenderResult<Self> {
        let device = &gpu.device;
        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("scene globals layout"),
            entries: &[uniform_entry(0)],
        });
        let mesh_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("mesh layout"),
            entries: &[uniform_entry(0)],
        });
        let fog_mesh_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("fog mesh layout"),
            entries: &[uniform_entry(0), uniform_entry(1)],
        });

        let globals = environment.globals(Mat4::IDENTITY, Vec3::ZERO);
        let globals_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("scene globals"),
            contents: bytemuck::bytes_of(&globals),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scene globals"),
            layout: &globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
        });

        let star_params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("star params"),
            size: std::mem::size_of::<StarParams>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let star_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("star params"),
            layout: &mesh_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: star_params_buffer.as_entire_binding(),
            }],
        });
        let star_pipeline = Self::create_star_pipeline(gpu, &globals_layout, &mesh_layout)?;

        Ok(Self {
            environment,
            globals_buffer,
            globals_bind_group,
            globals_layout,
            mesh_layout,
            fog_mesh_layout,
            pipelines: HashMap::new(),
            material_buffers: HashMap::new(),
            draws: Vec::new(),
            star_pipeline,
            star_params_buffer,
            star_bind_group,
            stars: None,
            depth: DepthTarget::new(gpu, width.max(1), height.max(1))?,
        })
    }

    pub fn environment(&self) -> &SceneEnvironment {
        &self.environment
    }

    /// Changes the clear color. Takes effect on the next rendered frame.
    pub fn set_background(&mut self, color: Vec3) {
        self.environment.background = color;
    }

    pub fn mesh_count(&self) -> usize {
        self.draws.len()
    }

    /// Number of distinct material pipelines built.
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    fn create_star_pipeline(
        gpu: &GpuContext,
        globals_layout: &wgpu::BindGroupLayout,
        params_layout: &wgpu::BindGroupLayout,
    ) -> RenderResult<wgpu::RenderPipeline> {
        let (shader, error) = gpu.scoped(|device| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("stars"),
                source: wgpu::ShaderSource::Wgsl(include_str!("shaders/stars.wgsl").into()),
            })
        });
        if let Some(error) = error {
            return Err(RenderError::ShaderCompilationFailed(format!("stars: {error}")));
        }
        let layout = gpu
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("stars"),
                bind_group_layouts: &[globals_layout, params_layout],
                push_constant_ranges: &[],
            });
        let (pipeline, error) = gpu.scoped(|device| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("stars"),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                        step_mode: wgpu::VertexStepMode::Instance,
                        attributes: &wgpu::vertex_attr_array![0 => Float32x3],
                    }],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: TARGET_FORMAT,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::LessEqual,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        });
        match error {
            Some(error) => Err(RenderError::PipelineCreationFailed(format!("stars: {error}"))),
            None => Ok(pipeline),
        }
    }

    /// Builds (once per material key) the pipeline for `instance`'s material.
    fn ensure_pipeline(&mut self, gpu: &GpuContext, instance: &MaterialInstance) -> RenderResult<()> {
        let material = &instance.material;
        let key = material.key();
        if self.pipelines.contains_key(&key) {
            return Ok(());
        }
        let label = material.label();
        let (shader, error) = gpu.scoped(|device| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(material.source().into()),
            })
        });
        if let Some(error) = error {
            return Err(RenderError::ShaderCompilationFailed(format!("{label}: {error}")));
        }

        let mesh_layout = if material.has_fog() {
            &self.fog_mesh_layout
        } else {
            &self.mesh_layout
        };
        let layout = gpu
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(label),
                bind_group_layouts: &[&self.globals_layout, mesh_layout],
                push_constant_ranges: &[],
            });

        let state = material.state;
        let cull_mode = match material.side {
            Side::Front => Some(wgpu::Face::Back),
            Side::Back => Some(wgpu::Face::Front),
            Side::Double => None,
        };
        let bias = state
            .polygon_offset
            .map_or_else(wgpu::DepthBiasState::default, |offset| wgpu::DepthBiasState {
                constant: offset.units as i32,
                slope_scale: offset.factor,
                clamp: 0.0,
            });
        let depth_compare = if state.depth_test {
            wgpu::CompareFunction::LessEqual
        } else {
            wgpu::CompareFunction::Always
        };
        let blend = state.transparent.then_some(wgpu::BlendState::ALPHA_BLENDING);

        let (pipeline, error) = gpu.scoped(|device| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<[f32; 6]>() as wgpu::BufferAddress,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3],
                    }],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: TARGET_FORMAT,
                        blend,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: state.depth_write,
                    depth_compare,
                    stencil: wgpu::StencilState::default(),
                    bias,
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        });
        if let Some(error) = error {
            return Err(RenderError::PipelineCreationFailed(format!("{label}: {error}")));
        }

        if material.has_fog() {
            let params = material.uniform_values().pack_bytes();
            let buffer = gpu
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(label),
                    contents: &params,
                    usage: wgpu::BufferUsages::UNIFORM,
                });
            self.material_buffers.insert(key, buffer);
        }
        log::debug!("built scene pipeline '{label}'");
        self.pipelines.insert(key, pipeline);
        Ok(())
    }

    /// Uploads a mesh and queues it for drawing with `instance`.
    ///
    /// Opaque meshes draw first; transparent meshes follow in draw order.
    pub fn add_mesh(
        &mut self,
        gpu: &GpuContext,
        label: &str,
        mesh: &MeshData,
        transform: Mat4,
        instance: &MaterialInstance,
    ) -> RenderResult<()> {
        if mesh.is_empty() {
            log::warn!("mesh '{label}' has no triangles, skipping");
            return Ok(());
        }
        self.ensure_pipeline(gpu, instance)?;

        let vertices: Vec<[f32; 6]> = mesh
            .positions
            .iter()
            .zip(&mesh.normals)
            .map(|(p, n)| [p[0], p[1], p[2], n[0], n[1], n[2]])
            .collect();
        let device = &gpu.device;
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let uniforms = MeshUniforms::new(transform, instance);
        let mesh_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::bytes_of(&uniforms),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let key = instance.material.key();
        let bind_group = if let Some(params) = self.material_buffers.get(&key) {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &self.fog_mesh_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: mesh_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: params.as_entire_binding(),
                    },
                ],
            })
        } else {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &self.mesh_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: mesh_buffer.as_entire_binding(),
                }],
            })
        };

        self.draws.push(MeshDraw {
            label: label.to_string(),
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
            bind_group,
            key,
            transparent: instance.material.state.transparent,
            draw_order: instance.draw_order,
        });
        self.draws
            .sort_by_key(|d| (d.transparent, d.draw_order));
        Ok(())
    }

    /// Replaces the starfield.
    pub fn set_stars(&mut self, gpu: &GpuContext, centers: &[Vec3], color: Vec3, size: f32) {
        if centers.is_empty() {
            self.stars = None;
            return;
        }
        let data: Vec<[f32; 3]> = centers.iter().map(|c| c.to_array()).collect();
        let instance_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("stars"),
                contents: bytemuck::cast_slice(&data),
                usage: wgpu::BufferUsages::VERTEX,
            });
        self.stars = Some(StarDraw {
            instance_buffer,
            count: centers.len() as u32,
            color,
            size,
        });
    }

    /// Writes per-frame globals. `jitter` shifts the projection by a
    /// sub-pixel amount in normalized device units.
    pub fn prepare(&self, queue: &wgpu::Queue, camera: &Camera, jitter: Vec2) {
        let globals = self
            .environment
            .globals(camera.jittered_view_projection(jitter), camera.position);
        queue.write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(&globals));

        if let Some(stars) = &self.stars {
            let view = camera.view_matrix();
            let params = StarParams {
                color: stars.color.extend(1.0).to_array(),
                camera_right: view.row(0).xyz().extend(0.0).to_array(),
                camera_up: view.row(1).xyz().extend(0.0).to_array(),
                size: [stars.size, 0.0, 0.0, 0.0],
            };
            queue.write_buffer(&self.star_params_buffer, 0, bytemuck::bytes_of(&params));
        }
    }

    pub fn resize(&mut self, gpu: &GpuContext, width: u32, height: u32) -> RenderResult<()> {
        if width == 0 || height == 0 || self.depth.size == (width, height) {
            return Ok(());
        }
        self.depth = DepthTarget::new(gpu, width, height)?;
        Ok(())
    }

    /// Clears `target` to the background and draws everything.
    pub fn render(&self, encoder: &mut wgpu::CommandEncoder, target: &wgpu::TextureView) {
        let background = self.environment.background;
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("scene"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: f64::from(background.x),
                        g: f64::from(background.y),
                        b: f64::from(background.z),
                        a: 1.0,
                    }),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Discard,
                }),
                stencil_ops: None,
            }),
            ..Default::default()
        });
        pass.set_bind_group(0, &self.globals_bind_group, &[]);

        if let Some(stars) = &self.stars {
            pass.set_pipeline(&self.star_pipeline);
            pass.set_bind_group(1, &self.star_bind_group, &[]);
            pass.set_vertex_buffer(0, stars.instance_buffer.slice(..));
            pass.draw(0..6, 0..stars.count);
        }

        for draw in &self.draws {
            let Some(pipeline) = self.pipelines.get(&draw.key) else {
                log::error!("no pipeline for mesh '{}'", draw.label);
                continue;
            };
            pass.set_pipeline(pipeline);
            pass.set_bind_group(1, &draw.bind_group, &[]);
            pass.set_vertex_buffer(0, draw.vertex_buffer.slice(..));
            pass.set_index_buffer(draw.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..draw.index_count, 0, 0..1);
        }
    }
}
