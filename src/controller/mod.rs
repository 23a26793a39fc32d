//! Controller input: state snapshots, edge signals and the gamepad collector
//!
//! ```text
//! gilrs ──► DeviceCollector ──watch──► ControllerState ──► skin engine
//!                  │                         │
//!                  └──mpsc──► DeviceEvent    └──► EdgeDetector ──► EdgeSignalSink
//! ```
//!
//! The skin engine only ever sees [`ControllerState`] values. Everything about
//! how they are produced lives in [`device_collector`].

pub mod device_collector;
pub mod edge;
pub mod state;

pub use device_collector::{
    CollectorSettings, DeviceError, DeviceEvent, DeviceEventKind, DeviceHandle,
};
pub use edge::{EdgeDetector, EdgeSignalSink, LoggingEdgeSink};
pub use state::{has_changed, ControllerState};
