//! Off-screen color targets: the ping-pong pair and the accumulation buffer.

use crate::error::{RenderError, RenderResult};
use crate::gpu::GpuContext;

/// Format of every intermediate target. Linear half floats, so emissive
/// values above 1.0 survive until the bloom threshold and the accumulation
/// blend does not band. Quantization happens once, at presentation or
/// readback.
pub const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Four f16 channels.
const BYTES_PER_TEXEL: u32 = 8;

/// A sampled, copyable color target.
pub struct RenderTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl RenderTarget {
    /// Allocates a zero-initialised target.
    pub fn new(gpu: &GpuContext, width: u32, height: u32, label: &str) -> RenderResult<Self> {
        let max = gpu.max_texture_dimension();
        if width == 0 || height == 0 || width > max || height > max {
            return Err(RenderError::TextureCreationFailed(format!(
                "{label}: {width}x{height} outside 1..={max}"
            )));
        }
        let (texture, error) = gpu.scoped(|device| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: TARGET_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_SRC
                    | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            })
        });
        if let Some(error) = error {
            return Err(RenderError::TextureCreationFailed(format!("{label}: {error}")));
        }
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(Self {
            texture,
            view,
            width,
            height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn extent(&self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: 1,
        }
    }

    /// Records a full copy of `self` into `dst`. Sizes must match.
    pub fn copy_to(&self, encoder: &mut wgpu::CommandEncoder, dst: &RenderTarget) {
        debug_assert_eq!(self.size(), dst.size());
        encoder.copy_texture_to_texture(
            self.texture.as_image_copy(),
            dst.texture.as_image_copy(),
            self.extent(),
        );
    }
}

/// The persistent accumulation target. Allocated on first use and
/// discarded whenever the viewport size changes.
///
/// Seeding is two-step: the pass that records the seeding copy calls
/// [`AccumulationSlot::begin_seed`], and the pipeline calls
/// [`AccumulationSlot::commit_seed`] once that frame is submitted.
#[derive(Default)]
pub struct AccumulationSlot {
    target: Option<RenderTarget>,
    seeded: bool,
    seed_pending: bool,
}

impl AccumulationSlot {
    /// Returns the target, creating a zero-cleared one at `width`x`height`
    /// if none exists or the existing one has a different size.
    pub fn get_or_create(
        &mut self,
        gpu: &GpuContext,
        width: u32,
        height: u32,
    ) -> RenderResult<&RenderTarget> {
        let stale = self
            .target
            .as_ref()
            .is_none_or(|t| t.size() != (width, height));
        if stale {
            log::debug!("allocating accumulation target {width}x{height}");
            self.target = Some(RenderTarget::new(gpu, width, height, "accumulation target")?);
            self.seeded = false;
            self.seed_pending = false;
        }
        self.target
            .as_ref()
            .ok_or(RenderError::MissingTarget("accumulation"))
    }

    pub fn target(&self) -> Option<&RenderTarget> {
        self.target.as_ref()
    }

    /// Whether a submitted frame has written the target.
    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    /// Records that the frame being encoded writes the seeding copy.
    pub fn begin_seed(&mut self) {
        if !self.seeded {
            self.seed_pending = true;
        }
    }

    /// Marks a pending seed as done. Called after submission.
    pub fn commit_seed(&mut self) {
        if std::mem::take(&mut self.seed_pending) && self.target.is_some() {
            self.seeded = true;
        }
    }

    /// Drops the target; the next use reallocates it.
    pub fn invalidate(&mut self) {
        self.target = None;
        self.seeded = false;
        self.seed_pending = false;
    }
}

/// Owns the intermediate targets shared by the pass pipeline.
pub struct RenderTargetManager {
    transient: [RenderTarget; 2],
    accumulation: AccumulationSlot,
}

impl RenderTargetManager {
    pub fn new(gpu: &GpuContext, width: u32, height: u32) -> RenderResult<Self> {
        Ok(Self {
            transient: [
                RenderTarget::new(gpu, width, height, "ping target")?,
                RenderTarget::new(gpu, width, height, "pong target")?,
            ],
            accumulation: AccumulationSlot::default(),
        })
    }

    pub fn size(&self) -> (u32, u32) {
        self.transient[0].size()
    }

    /// Reallocates the transient pair and drops the accumulation target.
    /// Returns false when the size is zero or unchanged.
    pub fn resize(&mut self, gpu: &GpuContext, width: u32, height: u32) -> RenderResult<bool> {
        if width == 0 || height == 0 || self.size() == (width, height) {
            return Ok(false);
        }
        self.transient = [
            RenderTarget::new(gpu, width, height, "ping target")?,
            RenderTarget::new(gpu, width, height, "pong target")?,
        ];
        self.accumulation.invalidate();
        Ok(true)
    }

    pub fn transient(&self, index: usize) -> &RenderTarget {
        &self.transient[index % 2]
    }

    pub fn accumulation(&self) -> &AccumulationSlot {
        &self.accumulation
    }

    pub fn accumulation_mut(&mut self) -> &mut AccumulationSlot {
        &mut self.accumulation
    }

    /// Splits into (read, write, accumulation) for one pass.
    pub fn split(&mut self, read: usize) -> (&RenderTarget, &RenderTarget, &mut AccumulationSlot) {
        let [a, b] = &self.transient;
        let (input, output) = if read % 2 == 0 { (a, b) } else { (b, a) };
        (input, output, &mut self.accumulation)
    }
}

fn aligned_bytes_per_row(width: u32) -> u32 {
    let unaligned = width * BYTES_PER_TEXEL;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unaligned.div_ceil(align) * align
}

/// Reads a target back as linear RGBA floats, four per texel, row by row
/// from the top left.
pub fn read_texels(gpu: &GpuContext, target: &RenderTarget) -> RenderResult<Vec<f32>> {
    let (width, height) = target.size();
    let bytes_per_row = aligned_bytes_per_row(width);
    let buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("readback buffer"),
        size: u64::from(bytes_per_row * height),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = gpu
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("readback encoder"),
        });
    encoder.copy_texture_to_buffer(
        target.texture.as_image_copy(),
        wgpu::TexelCopyBufferInfo {
            buffer: &buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(height),
            },
        },
        target.extent(),
    );
    gpu.queue.submit(std::iter::once(encoder.finish()));

    let slice = buffer.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    let _ = gpu.device.poll(wgpu::PollType::wait_indefinitely());
    rx.recv()
        .map_err(|_| RenderError::BufferMapFailed)?
        .map_err(|_| RenderError::BufferMapFailed)?;

    let data = slice.get_mapped_range();
    let row_bytes = (width * BYTES_PER_TEXEL) as usize;
    let mut texels = Vec::with_capacity((width * height * 4) as usize);
    for row in 0..height {
        let start = (row * bytes_per_row) as usize;
        texels.extend(decode_f16_row(&data[start..start + row_bytes]));
    }
    drop(data);
    buffer.unmap();
    Ok(texels)
}

fn decode_f16_row(bytes: &[u8]) -> impl Iterator<Item = f32> + '_ {
    bytes
        .chunks_exact(2)
        .map(|b| half::f16::from_le_bytes([b[0], b[1]]).to_f32())
}

/// Clamps a linear channel to `[0, 1]` and rounds it to eight bits.
pub fn quantize_unorm8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Reads a target back as tightly packed linear RGBA8 rows.
pub fn read_pixels(gpu: &GpuContext, target: &RenderTarget) -> RenderResult<Vec<u8>> {
    Ok(read_texels(gpu, target)?
        .into_iter()
        .map(quantize_unorm8)
        .collect())
}

/// Uploads tightly packed linear RGBA8 rows into a target.
pub fn write_pixels(gpu: &GpuContext, target: &RenderTarget, pixels: &[u8]) -> RenderResult<()> {
    let (width, height) = target.size();
    let expected = (width * height * 4) as usize;
    if pixels.len() != expected {
        return Err(RenderError::TextureCreationFailed(format!(
            "expected {expected} bytes, got {}",
            pixels.len()
        )));
    }
    let half_data: Vec<u16> = pixels
        .iter()
        .map(|&c| half::f16::from_f32(f32::from(c) / 255.0).to_bits())
        .collect();
    gpu.queue.write_texture(
        target.texture.as_image_copy(),
        bytemuck::cast_slice(&half_data),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(width * BYTES_PER_TEXEL),
            rows_per_image: Some(height),
        },
        target.extent(),
    );
    Ok(())
}
