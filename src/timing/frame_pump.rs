//! Frame pacing for the overlay
//!
//! Decides when a frame is worth drawing (state changed, or the forced refresh
//! interval ran out) and how long to idle afterwards to stay under the frame
//! rate cap.

use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct FramePump {
    target_interval: Duration,
    forced_refresh: Duration,
    last_render: Option<Instant>,
    window_start: Option<Instant>,
    frames_in_window: u32,
    fps: u32,
}

impl FramePump {
    pub fn new(max_fps: u32, forced_refresh: Duration) -> Self {
        Self {
            target_interval: Duration::from_secs(1) / max_fps.max(1),
            forced_refresh,
            last_render: None,
            window_start: None,
            frames_in_window: 0,
            fps: 0,
        }
    }

    pub fn target_interval(&self) -> Duration {
        self.target_interval
    }

    pub fn should_render(&self, changed: bool, now: Instant) -> bool {
        match self.last_render {
            None => true,
            Some(last) => changed || now.saturating_duration_since(last) >= self.forced_refresh,
        }
    }

    /// How long to idle after a frame that took `elapsed`; never negative
    pub fn sleep_for(&self, elapsed: Duration) -> Duration {
        self.target_interval.saturating_sub(elapsed)
    }

    /// Time until the forced refresh falls due
    pub fn until_forced(&self, now: Instant) -> Duration {
        match self.last_render {
            None => Duration::ZERO,
            Some(last) => self
                .forced_refresh
                .saturating_sub(now.saturating_duration_since(last)),
        }
    }

    pub fn mark_rendered(&mut self, now: Instant) {
        self.last_render = Some(now);
        // the frame that opens a window belongs to the one before it
        let Some(window_start) = self.window_start else {
            self.window_start = Some(now);
            return;
        };
        self.frames_in_window += 1;
        if now.saturating_duration_since(window_start) >= Duration::from_secs(1) {
            self.fps = self.frames_in_window;
            debug!("Overlay running at {} fps", self.fps);
            self.frames_in_window = 0;
            self.window_start = Some(now);
        }
    }

    /// Frames drawn during the last full second
    pub fn fps(&self) -> u32 {
        self.fps
    }
}
