//! Clock-driven helpers for the overlay loop. Both take `Instant`s from the
//! caller instead of reading the clock, so they can be stepped in tests.

pub mod debounce;
pub mod frame_pump;

pub use debounce::Debouncer;
pub use frame_pump::FramePump;
