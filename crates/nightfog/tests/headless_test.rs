//! Headless rendering integration tests.
//!
//! These need a GPU adapter (real or software fallback). Without one each
//! test prints a skip notice and returns.

use nightfog::*;
use nightfog_core::MeshData;

fn skip(e: &AppError) {
    eprintln!("Skipping headless test: no GPU adapter available ({e})");
}

fn cube() -> LoadedModel {
    let positions = vec![
        [-0.5, -0.5, -0.5],
        [0.5, -0.5, -0.5],
        [0.5, 0.5, -0.5],
        [-0.5, 0.5, -0.5],
        [-0.5, -0.5, 0.5],
        [0.5, -0.5, 0.5],
        [0.5, 0.5, 0.5],
        [-0.5, 0.5, 0.5],
    ];
    let indices = vec![
        0, 2, 1, 0, 3, 2, 4, 5, 6, 4, 6, 7, 0, 1, 5, 0, 5, 4, 3, 6, 2, 3, 7, 6, 0, 4, 7, 0, 7,
        3, 1, 2, 6, 1, 6, 5,
    ];
    LoadedModel {
        mesh_id: "model_0".into(),
        index: 0,
        mesh: MeshData::new(positions, None, indices),
    }
}

#[test]
fn empty_scene_renders_expected_buffer_size() {
    let config = SceneConfig::default();
    match render_to_image(&config, &[], 64, 48) {
        Ok(pixels) => assert_eq!(pixels.len(), 64 * 48 * 4),
        Err(e) => skip(&e),
    }
}

#[test]
fn rendering_is_deterministic() {
    let config = SceneConfig::default().with_bloom(true);
    let models = [cube()];
    let first = match render_to_image(&config, &models, 32, 32) {
        Ok(pixels) => pixels,
        Err(e) => return skip(&e),
    };
    let second = render_to_image(&config, &models, 32, 32).unwrap();
    assert_eq!(first, second);
}

#[test]
fn headless_renderer_follows_resize() {
    let config = SceneConfig::default().with_taa(true).with_bloom(false);
    let mut renderer = match HeadlessRenderer::new(&config, &[cube()], 16, 16) {
        Ok(renderer) => renderer,
        Err(e) => return skip(&e),
    };
    assert_eq!(renderer.pipeline().pass_names(), ["scene", "taa"]);
    let camera = Camera::from_config(&config.camera, 1.0);
    renderer.render_frame(&camera).unwrap();
    assert_eq!(renderer.pixels().len(), 16 * 16 * 4);

    renderer.resize(40, 20).unwrap();
    assert_eq!(renderer.size(), (40, 20));
    renderer.render_frame(&camera).unwrap();
    assert_eq!(renderer.pixels().len(), 40 * 20 * 4);
}

#[test]
fn driver_runs_the_headless_renderer() {
    let config = SceneConfig::constrained();
    let renderer = match HeadlessRenderer::new(&config, &[], 24, 24) {
        Ok(renderer) => renderer,
        Err(e) => return skip(&e),
    };
    let mut driver = FrameDriver::new(
        renderer,
        &config.camera,
        config.target_frame_interval_ms,
        24,
        24,
    );
    let outcomes: Vec<TickOutcome> = (0..8).map(|_| driver.tick(10.0, None)).collect();
    assert_eq!(
        outcomes.iter().filter(|o| **o == TickOutcome::Rendered).count(),
        2
    );
    assert_eq!(driver.renderer().pipeline().frame_index(), 2);
}

#[test]
fn render_to_file_writes_png() {
    let path = std::env::temp_dir().join(format!("nightfog-headless-{}.png", std::process::id()));
    let config = SceneConfig::default();
    match render_to_file(&path, &config, &[], 20, 10) {
        Ok(()) => {
            let img = image::open(&path).unwrap();
            assert_eq!((img.width(), img.height()), (20, 10));
            let _ = std::fs::remove_file(&path);
        }
        Err(e) => skip(&e),
    }
}
