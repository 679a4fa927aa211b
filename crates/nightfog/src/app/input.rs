use std::sync::Arc;
use std::time::Instant;

use pollster::FutureExt;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowId};

use nightfog_core::camera::cursor_to_ndc;
use nightfog_core::pick;

use super::{App, WindowRenderer};
use crate::driver::{FrameDriver, TickOutcome};

/// Pointer travel, in pixels, below which a press and release is a click.
const CLICK_SLOP: f64 = 4.0;

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attributes = Window::default_attributes()
            .with_title("nightfog")
            .with_inner_size(LogicalSize::new(1280, 720));

        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .expect("failed to create window"),
        );

        let renderer = match WindowRenderer::new(window.clone(), &self.config, &self.models)
            .block_on()
        {
            Ok(renderer) => renderer,
            Err(e) => {
                log::error!("failed to start renderer: {e}");
                event_loop.exit();
                return;
            }
        };
        let (width, height) = renderer.size();
        let driver = FrameDriver::new(
            renderer,
            &self.config.camera,
            self.config.target_frame_interval_ms,
            width,
            height,
        );

        window.request_redraw();
        self.window = Some(window);
        self.driver = Some(driver);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(driver) = &mut self.driver {
                    driver.request_resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let delta_ms = self
                    .last_frame_time
                    .map_or(0.0, |last| now.duration_since(last).as_secs_f32() * 1000.0);
                self.last_frame_time = Some(now);

                self.orbit_input.advance(delta_ms);
                if let Some(driver) = &mut self.driver {
                    let outcome = driver.tick(delta_ms, self.orbit_input.user_orbit_angle());
                    if outcome == TickOutcome::Aborted {
                        log::debug!("frame {} aborted", driver.frames_rendered());
                    }
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = (position.x, position.y);
                self.orbit_input.pointer_moved(position.x as f32);
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => match state {
                ElementState::Pressed => {
                    self.press_pos = Some(self.cursor);
                    if let Some(driver) = &self.driver {
                        let angle = driver.orbit().angle_of(driver.camera().position);
                        self.orbit_input.pointer_down(self.cursor.0 as f32, angle);
                    }
                }
                ElementState::Released => {
                    self.orbit_input.pointer_up();
                    if let Some((x, y)) = self.press_pos.take() {
                        let travel = (self.cursor.0 - x).abs() + (self.cursor.1 - y).abs();
                        if travel < CLICK_SLOP {
                            self.click(self.cursor);
                        }
                    }
                }
            },
            _ => {}
        }
    }
}

impl App {
    /// Casts a ray from the cursor and reports the hotspot it hits.
    fn click(&self, (x, y): (f64, f64)) {
        let (Some(driver), Some(window)) = (&self.driver, &self.window) else {
            return;
        };
        let size = window.inner_size();
        let ndc = cursor_to_ndc(x as f32, y as f32, size.width, size.height);
        let ray = driver.camera().ray_through(ndc);
        match pick(&self.hotspots, &ray) {
            Some((index, distance)) => {
                let link = &self.hotspots[index].link;
                log::info!("hotspot {index} hit at distance {distance:.2}: {link}");
            }
            None => log::debug!("click at ({x:.0}, {y:.0}) hit no hotspot"),
        }
    }
}
