//! Rising-edge detection on one configured button
//!
//! The overlay can hand a button press to something outside the engine (a
//! split timer, a hotkey relay). The detector only reports the `0 -> 1`
//! transition; what happens next is up to the injected sink.

use super::state::ControllerState;
use tracing::info;

pub trait EdgeSignalSink {
    fn on_rising_edge(&mut self, button_index: usize);
}

/// Sink that just logs the edge
#[derive(Debug, Default)]
pub struct LoggingEdgeSink;

impl EdgeSignalSink for LoggingEdgeSink {
    fn on_rising_edge(&mut self, button_index: usize) {
        info!("Edge signal: button {} pressed", button_index);
    }
}

#[derive(Debug, Clone)]
pub struct EdgeDetector {
    button_index: usize,
    previous: bool,
}

impl EdgeDetector {
    pub fn new(button_index: usize) -> Self {
        Self {
            button_index,
            previous: false,
        }
    }

    pub fn button_index(&self) -> usize {
        self.button_index
    }

    /// Feeds one snapshot; returns whether the sink fired. A missing snapshot
    /// (no device) leaves the remembered level untouched.
    pub fn observe(
        &mut self,
        state: Option<&ControllerState>,
        sink: &mut dyn EdgeSignalSink,
    ) -> bool {
        let Some(state) = state else {
            return false;
        };
        let pressed = state.button(self.button_index);
        let rising = pressed && !self.previous;
        self.previous = pressed;
        if rising {
            sink.on_rising_edge(self.button_index);
        }
        rising
    }
}
