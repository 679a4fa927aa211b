//! GPU integration tests for the pass pipeline.
//!
//! These need a GPU adapter (real or software fallback). Without one each
//! test prints a skip notice and returns.

use glam::{Mat4, Vec3};
use nightfog_core::effects;
use nightfog_core::{Camera, FogMaterialCompiler, MeshData, SceneConfig, ShaderRegistry};
use nightfog_render::{
    read_pixels, read_texels, write_pixels, GpuContext, Pass, PassContext, PassPipeline,
    RenderError, RenderResult, RenderTarget, SceneEnvironment, SceneRenderer, ShaderPass,
    TemporalAccumulationPass,
};

fn gpu() -> Option<GpuContext> {
    match pollster::block_on(GpuContext::new_headless()) {
        Ok(gpu) => Some(gpu),
        Err(e) => {
            eprintln!("Skipping GPU test: no GPU adapter available ({e})");
            None
        }
    }
}

fn camera(width: u32, height: u32) -> Camera {
    Camera::from_config(&SceneConfig::default().camera, width as f32 / height as f32)
}

/// Stands in for the scene: clears its output to one color.
struct SolidColor(wgpu::Color);

impl Pass for SolidColor {
    fn name(&self) -> &str {
        "solid"
    }

    fn enabled(&self) -> bool {
        true
    }

    fn set_size(&mut self, _gpu: &GpuContext, _width: u32, _height: u32) -> RenderResult<()> {
        Ok(())
    }

    fn render(
        &mut self,
        ctx: &mut PassContext<'_>,
        _input: &RenderTarget,
        output: &RenderTarget,
    ) -> RenderResult<()> {
        let _pass = ctx.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("solid"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &output.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.0),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            ..Default::default()
        });
        Ok(())
    }
}

/// Copies its input through, failing the next render or resize on request.
#[derive(Default)]
struct Flaky {
    fail_render: bool,
    fail_resize: bool,
}

impl Pass for Flaky {
    fn name(&self) -> &str {
        "flaky"
    }

    fn enabled(&self) -> bool {
        true
    }

    fn set_size(&mut self, _gpu: &GpuContext, width: u32, height: u32) -> RenderResult<()> {
        if std::mem::take(&mut self.fail_resize) {
            return Err(RenderError::TextureCreationFailed(format!("{width}x{height}")));
        }
        Ok(())
    }

    fn render(
        &mut self,
        ctx: &mut PassContext<'_>,
        input: &RenderTarget,
        output: &RenderTarget,
    ) -> RenderResult<()> {
        if std::mem::take(&mut self.fail_render) {
            return Err(RenderError::MissingTarget("flaky"));
        }
        input.copy_to(ctx.encoder, output);
        Ok(())
    }
}

fn red_channel(gpu: &GpuContext, target: &RenderTarget) -> Vec<u8> {
    read_pixels(gpu, target)
        .unwrap()
        .chunks(4)
        .map(|px| px[0])
        .collect()
}

fn empty_scene(gpu: &GpuContext, config: &SceneConfig, width: u32, height: u32) -> SceneRenderer {
    SceneRenderer::new(gpu, SceneEnvironment::from_config(config), width, height).unwrap()
}

#[test]
fn fog_tint_turns_red_into_blue() {
    let Some(gpu) = gpu() else { return };
    let config = SceneConfig::default();
    let registry = ShaderRegistry::with_builtin_effects().unwrap();
    let fog_tint = ShaderPass::new(&gpu, registry.get(effects::FOG_TINT).unwrap())
        .unwrap()
        .with_uniform("fog_color", Vec3::Z)
        .unwrap()
        .with_uniform("plane_fog", 0.0)
        .unwrap();
    let passes: Vec<Box<dyn Pass>> = vec![Box::new(SolidColor(wgpu::Color::RED)), Box::new(fog_tint)];
    let mut pipeline =
        PassPipeline::with_passes(&gpu, empty_scene(&gpu, &config, 2, 2), passes, None, 2, 2)
            .unwrap();

    let target = pipeline.render_offscreen(&gpu, &camera(2, 2)).unwrap();
    let pixels = read_pixels(&gpu, target).unwrap();
    assert_eq!(pixels.len(), 2 * 2 * 4);
    for px in pixels.chunks(4) {
        assert_eq!(px, [0, 0, 255, 255]);
    }
}

#[test]
fn disabled_pass_does_not_swap_targets() {
    let Some(gpu) = gpu() else { return };
    let config = SceneConfig::default();
    let registry = ShaderRegistry::with_builtin_effects().unwrap();
    let mut night = ShaderPass::new(&gpu, registry.get(effects::NIGHT_TINT).unwrap())
        .unwrap()
        .with_uniform("amount", 1.0)
        .unwrap();
    night.set_enabled(false);
    let passes: Vec<Box<dyn Pass>> = vec![Box::new(SolidColor(wgpu::Color::RED)), Box::new(night)];
    let mut pipeline =
        PassPipeline::with_passes(&gpu, empty_scene(&gpu, &config, 4, 4), passes, None, 4, 4)
            .unwrap();

    let target = pipeline.render_offscreen(&gpu, &camera(4, 4)).unwrap();
    let pixels = read_pixels(&gpu, target).unwrap();
    assert!(pixels.chunks(4).all(|px| px == [255, 0, 0, 255]));
}

#[test]
fn resize_reallocates_every_target() {
    let Some(gpu) = gpu() else { return };
    let config = SceneConfig::default().with_taa(true);
    let scene = empty_scene(&gpu, &config, 8, 8);
    let mut pipeline = PassPipeline::new(&gpu, &config, scene, None, 8, 8).unwrap();
    let camera = camera(8, 8);
    pipeline.render_offscreen(&gpu, &camera).unwrap();
    assert!(pipeline.targets().accumulation().is_seeded());

    pipeline.resize(&gpu, 16, 4).unwrap();
    assert_eq!(pipeline.targets().size(), (16, 4));
    assert_eq!(pipeline.targets().transient(0).size(), (16, 4));
    assert_eq!(pipeline.targets().transient(1).size(), (16, 4));
    assert!(pipeline.targets().accumulation().target().is_none());
    assert!(!pipeline.targets().accumulation().is_seeded());

    // Zero and repeated sizes are no-ops.
    pipeline.resize(&gpu, 0, 0).unwrap();
    pipeline.resize(&gpu, 16, 4).unwrap();
    assert_eq!(pipeline.targets().size(), (16, 4));

    let target = pipeline.render_offscreen(&gpu, &camera).unwrap();
    assert_eq!(target.size(), (16, 4));
    let accumulation = pipeline.targets().accumulation().target().unwrap();
    assert_eq!(accumulation.size(), (16, 4));
}

#[test]
fn accumulation_of_a_static_frame_is_stable() {
    let Some(gpu) = gpu() else { return };
    let mut config = SceneConfig::default()
        .with_taa(true)
        .with_bloom(false)
        .with_accumulation_window(2);
    config.background_color = Vec3::new(0.0, 1.0, 0.0);
    let scene = empty_scene(&gpu, &config, 4, 4);
    let mut pipeline = PassPipeline::new(&gpu, &config, scene, None, 4, 4).unwrap();
    assert_eq!(pipeline.pass_names(), ["scene", "taa"]);

    let camera = camera(4, 4);
    // Two accumulating frames, two holding, one accumulating again.
    for _ in 0..5 {
        let target = pipeline.render_offscreen(&gpu, &camera).unwrap();
        let pixels = read_pixels(&gpu, target).unwrap();
        assert!(pixels.chunks(4).all(|px| px == [0, 255, 0, 255]));
    }
    assert_eq!(pipeline.frame_index(), 5);
}

#[test]
fn configured_pipeline_orders_fxaa_before_bloom() {
    let Some(gpu) = gpu() else { return };
    let config = SceneConfig::default()
        .with_fxaa(true)
        .with_bloom(true)
        .with_night_amount(0.3);
    let scene = empty_scene(&gpu, &config, 32, 32);
    let mut pipeline = PassPipeline::new(&gpu, &config, scene, None, 32, 32).unwrap();
    assert_eq!(pipeline.pass_names(), ["scene", "fxaa", "bloom", "night_tint"]);
    pipeline.render_offscreen(&gpu, &camera(32, 32)).unwrap();
}

#[test]
fn fog_materials_build_and_draw() {
    let Some(gpu) = gpu() else { return };
    let config = SceneConfig::default();
    let mut compiler = FogMaterialCompiler::new().unwrap();
    let mut scene = empty_scene(&gpu, &config, 16, 16);

    let sky = compiler
        .compile(config.sky.color, nightfog_core::Side::Back, config.fog.height, config.fog.color)
        .unwrap();
    let sky = nightfog_core::MaterialInstance {
        material: sky,
        opacity: 1.0,
        emissive: Vec3::ZERO,
        draw_order: 0,
    };
    scene
        .add_mesh(&gpu, "sky", &MeshData::uv_sphere(17.0, 15, 15), Mat4::IDENTITY, &sky)
        .unwrap();
    let wall = compiler
        .assign_material("wall", None, 1, &config.fog)
        .unwrap();
    scene
        .add_mesh(&gpu, "wall", &MeshData::uv_sphere(1.0, 8, 6), Mat4::IDENTITY, &wall)
        .unwrap();
    assert_eq!(scene.mesh_count(), 2);
    assert_eq!(scene.pipeline_count(), 2);

    let mut pipeline = PassPipeline::new(&gpu, &config, scene, None, 16, 16).unwrap();
    let target = pipeline.render_offscreen(&gpu, &camera(16, 16)).unwrap();
    let pixels = read_pixels(&gpu, target).unwrap();
    assert_eq!(pixels.len(), 16 * 16 * 4);
}

#[test]
fn accumulation_blends_new_frames_and_holds_between_windows() {
    let Some(gpu) = gpu() else { return };
    let mut config = SceneConfig::default()
        .with_taa(true)
        .with_bloom(false)
        .with_accumulation_window(2)
        .with_taa_alpha(0.1);
    config.background_color = Vec3::splat(0.2);
    let scene = empty_scene(&gpu, &config, 4, 4);
    let mut pipeline = PassPipeline::new(&gpu, &config, scene, None, 4, 4).unwrap();
    let camera = camera(4, 4);

    // Seeds the buffer.
    let target = pipeline.render_offscreen(&gpu, &camera).unwrap();
    assert!(red_channel(&gpu, target).iter().all(|&r| r == 51));

    // 0.2 * 0.9 + 1.0 * 0.1 = 0.28
    pipeline.scene_mut().set_background(Vec3::ONE);
    let target = pipeline.render_offscreen(&gpu, &camera).unwrap();
    assert!(red_channel(&gpu, target).iter().all(|&r| r.abs_diff(71) <= 1));

    // Holding ignores the new scene.
    pipeline.scene_mut().set_background(Vec3::ZERO);
    for _ in 0..2 {
        let target = pipeline.render_offscreen(&gpu, &camera).unwrap();
        assert!(red_channel(&gpu, target).iter().all(|&r| r.abs_diff(71) <= 1));
    }

    // Accumulating again: 0.28 * 0.9 = 0.252
    let target = pipeline.render_offscreen(&gpu, &camera).unwrap();
    assert!(red_channel(&gpu, target).iter().all(|&r| r.abs_diff(64) <= 1));
}

#[test]
fn aborted_frame_does_not_advance_accumulation() {
    let Some(gpu) = gpu() else { return };
    let config = SceneConfig::default();
    let registry = ShaderRegistry::with_builtin_effects().unwrap();
    let taa = TemporalAccumulationPass::new(&gpu, &registry, 1, 0.1, 4, 4).unwrap();
    let flaky = Flaky {
        fail_render: true,
        ..Flaky::default()
    };
    let passes: Vec<Box<dyn Pass>> = vec![Box::new(taa), Box::new(flaky)];
    let mut pipeline =
        PassPipeline::with_passes(&gpu, empty_scene(&gpu, &config, 4, 4), passes, None, 4, 4)
            .unwrap();
    let camera = camera(4, 4);

    assert!(pipeline.render_offscreen(&gpu, &camera).is_err());
    assert_eq!(pipeline.frame_index(), 0);
    assert!(!pipeline.targets().accumulation().is_seeded());

    // First submitted frame accumulates and seeds.
    pipeline.scene_mut().set_background(Vec3::ONE);
    let target = pipeline.render_offscreen(&gpu, &camera).unwrap();
    assert!(red_channel(&gpu, target).iter().all(|&r| r == 255));
    assert!(pipeline.targets().accumulation().is_seeded());

    // Second submitted frame holds.
    pipeline.scene_mut().set_background(Vec3::ZERO);
    let target = pipeline.render_offscreen(&gpu, &camera).unwrap();
    assert!(red_channel(&gpu, target).iter().all(|&r| r == 255));
    assert_eq!(pipeline.frame_index(), 2);
}

#[test]
fn failed_resize_keeps_the_old_size_and_retries() {
    let Some(gpu) = gpu() else { return };
    let config = SceneConfig::default();
    let flaky = Flaky {
        fail_resize: true,
        ..Flaky::default()
    };
    let passes: Vec<Box<dyn Pass>> = vec![Box::new(SolidColor(wgpu::Color::RED)), Box::new(flaky)];
    let mut pipeline =
        PassPipeline::with_passes(&gpu, empty_scene(&gpu, &config, 8, 8), passes, None, 8, 8)
            .unwrap();

    assert!(pipeline.resize(&gpu, 16, 4).is_err());
    assert_eq!(pipeline.targets().size(), (8, 8));

    pipeline.resize(&gpu, 16, 4).unwrap();
    assert_eq!(pipeline.targets().size(), (16, 4));
    let target = pipeline.render_offscreen(&gpu, &camera(16, 4)).unwrap();
    assert_eq!(target.size(), (16, 4));
}

#[test]
fn intermediate_targets_keep_values_above_one() {
    let Some(gpu) = gpu() else { return };
    let config = SceneConfig::default();
    let bright = wgpu::Color {
        r: 4.0,
        g: 0.5,
        b: 0.0,
        a: 1.0,
    };
    let passes: Vec<Box<dyn Pass>> = vec![Box::new(SolidColor(bright))];
    let mut pipeline =
        PassPipeline::with_passes(&gpu, empty_scene(&gpu, &config, 2, 2), passes, None, 2, 2)
            .unwrap();

    let target = pipeline.render_offscreen(&gpu, &camera(2, 2)).unwrap();
    let texels = read_texels(&gpu, target).unwrap();
    for px in texels.chunks(4) {
        assert_eq!(px, [4.0, 0.5, 0.0, 1.0]);
    }
    // Eight-bit readback clamps.
    let pixels = read_pixels(&gpu, target).unwrap();
    assert_eq!(&pixels[..4], [255, 128, 0, 255]);
}

#[test]
fn uploaded_pixels_feed_the_next_pass() {
    let Some(gpu) = gpu() else { return };
    let config = SceneConfig::default();
    let passes: Vec<Box<dyn Pass>> = vec![Box::new(Flaky::default())];
    let mut pipeline =
        PassPipeline::with_passes(&gpu, empty_scene(&gpu, &config, 2, 1), passes, None, 2, 1)
            .unwrap();

    let data = [10, 20, 30, 255, 200, 150, 100, 255];
    write_pixels(&gpu, pipeline.targets().transient(0), &data).unwrap();
    let target = pipeline.render_offscreen(&gpu, &camera(2, 1)).unwrap();
    assert_eq!(read_pixels(&gpu, target).unwrap(), data);
}
