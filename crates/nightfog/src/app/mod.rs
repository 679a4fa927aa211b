//! Application window and event loop management.

mod input;
mod render;

use std::sync::Arc;
use std::time::Instant;

use winit::event_loop::EventLoop;
use winit::window::Window;

use nightfog_core::{Hotspot, OrbitInput, SceneConfig};

use crate::assets::LoadedModel;
use crate::driver::FrameDriver;

pub use render::WindowRenderer;

/// The nightfog application state.
pub struct App {
    config: SceneConfig,
    models: Vec<LoadedModel>,
    hotspots: Vec<Hotspot>,
    window: Option<Arc<Window>>,
    driver: Option<FrameDriver<WindowRenderer>>,
    orbit_input: OrbitInput,
    // Cursor position in physical pixels
    cursor: (f64, f64),
    // Where the left button went down; a release nearby counts as a click
    press_pos: Option<(f64, f64)>,
    last_frame_time: Option<Instant>,
}

impl App {
    pub fn new(config: SceneConfig, models: Vec<LoadedModel>) -> Self {
        let hotspots = config.hotspots.iter().map(Hotspot::from).collect();
        let orbit_input = OrbitInput::from_config(&config.camera);
        Self {
            config,
            models,
            hotspots,
            window: None,
            driver: None,
            orbit_input,
            cursor: (0.0, 0.0),
            press_pos: None,
            last_frame_time: None,
        }
    }
}

/// Runs the application until the window closes.
pub fn run_app(config: SceneConfig, models: Vec<LoadedModel>) {
    let event_loop = EventLoop::new().expect("failed to create event loop");
    let mut app = App::new(config, models);

    event_loop.run_app(&mut app).expect("event loop error");
}
