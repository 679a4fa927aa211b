//! Frame driver tests against a recording renderer; no GPU needed.

use nightfog::{AppError, Camera, CameraConfig, FrameDriver, FrameRenderer, TickOutcome};
use nightfog_render::RenderError;
use proptest::prelude::*;

#[derive(Default)]
struct Recorder {
    frames: Vec<Camera>,
    resizes: Vec<(u32, u32)>,
    fail_next_frame: bool,
    fail_next_resize: bool,
    size: Option<(u32, u32)>,
}

impl FrameRenderer for Recorder {
    fn render_frame(&mut self, camera: &Camera) -> nightfog::Result<()> {
        if std::mem::take(&mut self.fail_next_frame) {
            return Err(AppError::Render(RenderError::MissingTarget("accumulation")));
        }
        self.frames.push(*camera);
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) -> nightfog::Result<()> {
        self.resizes.push((width, height));
        if std::mem::take(&mut self.fail_next_resize) {
            return Err(AppError::Render(RenderError::TextureCreationFailed(format!(
                "{width}x{height}"
            ))));
        }
        self.size = Some((width, height));
        Ok(())
    }
}

fn driver(interval: Option<f32>) -> FrameDriver<Recorder> {
    FrameDriver::new(Recorder::default(), &CameraConfig::default(), interval, 800, 600)
}

#[test]
fn every_tick_renders_without_a_target_interval() {
    let mut driver = driver(None);
    for _ in 0..5 {
        assert_eq!(driver.tick(16.0, None), TickOutcome::Rendered);
    }
    assert_eq!(driver.frames_rendered(), 5);
}

#[test]
fn frame_skip_renders_every_fourth_tick_at_10ms() {
    let mut driver = driver(Some(33.33));
    let rendered: Vec<usize> = (1..=12)
        .filter(|_| driver.tick(10.0, None) == TickOutcome::Rendered)
        .collect();
    assert_eq!(rendered, [4, 8, 12]);
    assert_eq!(driver.renderer().frames.len(), 3);
}

#[test]
fn resize_waits_for_an_executed_frame() {
    let mut driver = driver(Some(33.33));
    driver.request_resize(1024, 512);
    for _ in 0..3 {
        assert_eq!(driver.tick(10.0, None), TickOutcome::Skipped);
    }
    assert!(driver.renderer().resizes.is_empty());

    assert_eq!(driver.tick(10.0, None), TickOutcome::Rendered);
    assert_eq!(driver.renderer().resizes, [(1024, 512)]);
    assert!((driver.camera().aspect - 2.0).abs() < 1e-6);

    // Applied once only.
    for _ in 0..4 {
        driver.tick(10.0, None);
    }
    assert_eq!(driver.renderer().resizes.len(), 1);
}

#[test]
fn latest_resize_request_wins() {
    let mut driver = driver(None);
    driver.request_resize(100, 100);
    driver.request_resize(300, 100);
    driver.tick(16.0, None);
    assert_eq!(driver.renderer().resizes, [(300, 100)]);
}

#[test]
fn zero_sized_resize_is_ignored() {
    let mut driver = driver(None);
    driver.request_resize(0, 600);
    driver.request_resize(800, 0);
    driver.tick(16.0, None);
    assert!(driver.renderer().resizes.is_empty());
    assert!((driver.camera().aspect - 800.0 / 600.0).abs() < 1e-6);
}

#[test]
fn failed_frame_is_aborted_and_the_loop_continues() {
    let mut driver = driver(None);
    driver.renderer_mut().fail_next_frame = true;
    assert_eq!(driver.tick(16.0, None), TickOutcome::Aborted);
    assert_eq!(driver.frames_rendered(), 0);
    assert_eq!(driver.tick(16.0, None), TickOutcome::Rendered);
    assert_eq!(driver.frames_rendered(), 1);
}

#[test]
fn automatic_orbit_follows_elapsed_time() {
    let config = CameraConfig::default();
    let mut driver = driver(None);
    driver.tick(1000.0, None);
    driver.tick(1000.0, None);

    let expected = driver.orbit().position_at(2.0 * config.auto_spin_rate);
    let frames = &driver.renderer().frames;
    assert!(frames[1].position.distance(expected) < 1e-4);
    assert_eq!(frames[1].target, config.look_at);
}

#[test]
fn user_angle_replaces_automatic_orbit() {
    let mut driver = driver(None);
    driver.tick(5000.0, Some(0.0));
    let at_zero = driver.orbit().position_at(0.0);
    assert!(driver.camera().position.distance(at_zero) < 1e-5);

    driver.tick(16.0, Some(1.0));
    let at_one = driver.orbit().position_at(1.0);
    assert!(driver.renderer().frames[1].position.distance(at_one) < 1e-5);
}

#[test]
fn skipped_ticks_still_advance_the_orbit_clock() {
    let config = CameraConfig::default();
    let mut driver = driver(Some(100.0));
    assert_eq!(driver.tick(60.0, None), TickOutcome::Skipped);
    assert_eq!(driver.tick(60.0, None), TickOutcome::Rendered);
    let expected = driver.orbit().position_at(0.12 * config.auto_spin_rate);
    assert!(driver.camera().position.distance(expected) < 1e-4);
}

#[test]
fn failed_resize_is_retried_on_the_next_frame() {
    let mut driver = driver(None);
    driver.renderer_mut().fail_next_resize = true;
    driver.request_resize(1024, 512);

    assert_eq!(driver.tick(16.0, None), TickOutcome::Aborted);
    assert_eq!(driver.pending_resize(), Some((1024, 512)));
    assert_eq!(driver.renderer().size, None);
    assert!(driver.renderer().frames.is_empty());

    for _ in 0..5 {
        assert_eq!(driver.tick(16.0, None), TickOutcome::Rendered);
    }
    assert_eq!(driver.pending_resize(), None);
    assert_eq!(driver.renderer().size, Some((1024, 512)));
    assert_eq!(driver.renderer().resizes, [(1024, 512), (1024, 512)]);
    assert!((driver.camera().aspect - 2.0).abs() < 1e-6);
}

#[test]
fn newer_request_replaces_a_failed_one() {
    let mut driver = driver(None);
    driver.renderer_mut().fail_next_resize = true;
    driver.request_resize(1024, 512);
    driver.tick(16.0, None);
    driver.request_resize(640, 480);
    assert_eq!(driver.tick(16.0, None), TickOutcome::Rendered);
    assert_eq!(driver.renderer().size, Some((640, 480)));
}

proptest! {
    #[test]
    fn prop_last_nonzero_request_is_applied_once(
        requests in prop::collection::vec((0u32..4, 0u32..4), 0..12)
    ) {
        let mut driver = driver(None);
        for &(width, height) in &requests {
            driver.request_resize(width, height);
        }
        driver.tick(16.0, None);
        driver.tick(16.0, None);

        let expected: Vec<(u32, u32)> = requests
            .iter()
            .rev()
            .find(|(w, h)| *w > 0 && *h > 0)
            .copied()
            .into_iter()
            .collect();
        prop_assert_eq!(&driver.renderer().resizes, &expected);
    }
}
