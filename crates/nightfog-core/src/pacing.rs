//! Frame-rate throttling.

/// Decides which display refreshes execute a frame.
///
/// Wall-clock time accumulates across skipped ticks; a frame executes once
/// the total reaches the target interval, and the total then restarts from
/// zero.
#[derive(Debug, Clone, PartialEq)]
pub struct FramePacer {
    target_interval_ms: Option<f32>,
    since_last_ms: f32,
}

impl FramePacer {
    pub fn new(target_interval_ms: Option<f32>) -> Self {
        Self {
            target_interval_ms,
            since_last_ms: 0.0,
        }
    }

    pub fn target_interval_ms(&self) -> Option<f32> {
        self.target_interval_ms
    }

    /// Records `delta_ms` and reports whether this tick should render.
    pub fn should_render(&mut self, delta_ms: f32) -> bool {
        let Some(target) = self.target_interval_ms else {
            return true;
        };
        self.since_last_ms += delta_ms;
        if self.since_last_ms < target {
            return false;
        }
        self.since_last_ms = 0.0;
        true
    }
}
