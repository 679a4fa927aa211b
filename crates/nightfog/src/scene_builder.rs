//! Assembles the night scene: sky dome, moon, stars and the loaded models.

use glam::{Mat4, Vec3};
use nightfog_core::{
    starfield, FogMaterialCompiler, MaterialInstance, MeshData, SceneConfig, Side,
};
use nightfog_render::{GpuContext, SceneEnvironment, SceneRenderer};

use crate::assets::LoadedModel;
use crate::error::Result;

/// Draw order of the first loaded model; the sky draws before it.
const FIRST_MODEL_ORDER: u32 = 1;

/// Builds a scene renderer populated with everything `config` describes.
pub fn build_scene(
    gpu: &GpuContext,
    config: &SceneConfig,
    models: &[LoadedModel],
    width: u32,
    height: u32,
) -> Result<SceneRenderer> {
    let mut scene = SceneRenderer::new(gpu, SceneEnvironment::from_config(config), width, height)?;
    let mut compiler = FogMaterialCompiler::new()?;
    let fog = &config.fog;

    let sky = MaterialInstance {
        material: compiler.compile(config.sky.color, Side::Back, fog.height, fog.color)?,
        opacity: 1.0,
        emissive: Vec3::ZERO,
        draw_order: 0,
    };
    let sky_mesh = MeshData::uv_sphere(config.sky.radius, config.sky.segments, config.sky.segments);
    scene.add_mesh(gpu, "sky", &sky_mesh, Mat4::IDENTITY, &sky)?;

    let moonlight = &config.lighting.moonlight;
    let moon = MaterialInstance {
        material: compiler.compile_base(moonlight.color, Side::Front)?,
        opacity: 1.0,
        emissive: moonlight.color,
        draw_order: 0,
    };
    let segments = config.lighting.moon_segments;
    let moon_mesh = MeshData::uv_sphere(config.lighting.moon_radius, segments, segments);
    scene.add_mesh(
        gpu,
        "moon",
        &moon_mesh,
        Mat4::from_translation(moonlight.position),
        &moon,
    )?;

    let stars = starfield(&config.stars);
    scene.set_stars(gpu, &stars, config.stars.color, config.stars.size);

    for model in models {
        let appearance = config.models.appearances.get(&model.mesh_id);
        let draw_order = FIRST_MODEL_ORDER + model.index as u32;
        let instance = compiler.assign_material(&model.mesh_id, appearance, draw_order, fog)?;
        let transform = config.models.model_matrix(&model.mesh_id);
        scene.add_mesh(gpu, &model.mesh_id, &model.mesh, transform, &instance)?;
    }

    log::info!(
        "scene built: {} meshes, {} stars, {} materials",
        scene.mesh_count(),
        stars.len(),
        compiler.len()
    );
    Ok(scene)
}
