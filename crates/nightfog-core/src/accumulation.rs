//! Temporal accumulation schedule and blend law.
//!
//! The accumulation pass alternates between two phases of `window` executed
//! frames each. While accumulating, every frame is blended into a persistent
//! buffer; while holding, the buffer is shown unchanged.

use glam::Vec4;

/// Phase of the accumulation pass for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccumulationState {
    Accumulating,
    Holding,
}

/// Frame counter driving the accumulate/hold toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccumulationSchedule {
    window: u64,
    frame_counter: u64,
}

impl AccumulationSchedule {
    pub fn new(window: u32) -> Self {
        Self {
            window: u64::from(window.max(1)),
            frame_counter: 0,
        }
    }

    /// Even quotients accumulate, odd quotients hold.
    pub fn state_at(window: u32, frame_counter: u64) -> AccumulationState {
        if (frame_counter / u64::from(window.max(1))) % 2 == 0 {
            AccumulationState::Accumulating
        } else {
            AccumulationState::Holding
        }
    }

    pub fn window(&self) -> u64 {
        self.window
    }

    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    /// State of the frame about to execute.
    pub fn state(&self) -> AccumulationState {
        if (self.frame_counter / self.window) % 2 == 0 {
            AccumulationState::Accumulating
        } else {
            AccumulationState::Holding
        }
    }

    /// Returns the state for the current frame and moves to the next.
    /// Call once per executed frame.
    pub fn advance(&mut self) -> AccumulationState {
        let state = self.state();
        self.frame_counter += 1;
        if self.state() != state {
            log::trace!(
                "accumulation switches to {:?} at frame {}",
                self.state(),
                self.frame_counter
            );
        }
        state
    }
}

/// `accumulated * (1 - alpha) + current * alpha`.
pub fn blend(accumulated: f32, current: f32, alpha: f32) -> f32 {
    accumulated * (1.0 - alpha) + current * alpha
}

/// Per-channel [`blend`].
pub fn blend_color(accumulated: Vec4, current: Vec4, alpha: f32) -> Vec4 {
    accumulated * (1.0 - alpha) + current * alpha
}
