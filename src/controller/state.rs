//! Controller state snapshots and change detection

use serde::{Deserialize, Serialize};

/// Immutable snapshot of every button and axis at one sampling instant.
///
/// Lookups past the end read as released / centered, so a skin can reference
/// inputs a device does not have.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ControllerState {
    buttons: Vec<bool>,
    axes: Vec<f32>,
}

impl ControllerState {
    pub fn new(buttons: Vec<bool>, axes: Vec<f32>) -> Self {
        Self { buttons, axes }
    }

    /// All released and centered, sized for `buttons` and `axes` inputs
    pub fn idle(buttons: usize, axes: usize) -> Self {
        Self {
            buttons: vec![false; buttons],
            axes: vec![0.0; axes],
        }
    }

    pub fn button(&self, index: usize) -> bool {
        self.buttons.get(index).copied().unwrap_or(false)
    }

    pub fn axis(&self, index: usize) -> f32 {
        self.axes.get(index).copied().unwrap_or(0.0)
    }

    pub fn buttons(&self) -> &[bool] {
        &self.buttons
    }

    pub fn axes(&self) -> &[f32] {
        &self.axes
    }

    pub fn set_button(&mut self, index: usize, pressed: bool) {
        if self.buttons.len() <= index {
            self.buttons.resize(index + 1, false);
        }
        self.buttons[index] = pressed;
    }

    pub fn set_axis(&mut self, index: usize, value: f32) {
        if self.axes.len() <= index {
            self.axes.resize(index + 1, 0.0);
        }
        self.axes[index] = value;
    }
}

// Axes compare bitwise-or-numerically so a NaN reading equals itself and a
// snapshot is never "changed" against its own copy.
impl PartialEq for ControllerState {
    fn eq(&self, other: &Self) -> bool {
        self.buttons == other.buttons
            && self.axes.len() == other.axes.len()
            && self
                .axes
                .iter()
                .zip(&other.axes)
                .all(|(a, b)| a == b || a.to_bits() == b.to_bits())
    }
}

impl Eq for ControllerState {}

/// Whether a redraw is warranted going from `previous` to `current`
pub fn has_changed(previous: Option<&ControllerState>, current: Option<&ControllerState>) -> bool {
    previous != current
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_snapshot_is_unchanged() {
        let state = ControllerState::new(vec![true, false], vec![0.5, -1.0]);
        assert!(!has_changed(Some(&state), Some(&state.clone())));
        assert!(!has_changed(None, None));
        assert!(has_changed(None, Some(&state)));
        assert!(has_changed(Some(&state), None));
    }

    #[test]
    fn any_element_difference_is_a_change() {
        let a = ControllerState::new(vec![true, false], vec![0.5]);
        let mut b = a.clone();
        b.set_axis(0, 0.25);
        assert!(has_changed(Some(&a), Some(&b)));

        let mut c = a.clone();
        c.set_button(1, true);
        assert!(has_changed(Some(&a), Some(&c)));

        // a longer sequence differs even if the extra values are idle
        let mut d = a.clone();
        d.set_button(4, false);
        assert!(has_changed(Some(&a), Some(&d)));
    }

    #[test]
    fn nan_axes_equal_themselves() {
        let state = ControllerState::new(vec![], vec![f32::NAN]);
        assert!(!has_changed(Some(&state), Some(&state.clone())));
    }

    #[test]
    fn out_of_range_reads_are_idle() {
        let state = ControllerState::idle(2, 1);
        assert!(!state.button(10));
        assert_eq!(state.axis(7), 0.0);
        assert_eq!(state.buttons().len(), 2);
    }
}
