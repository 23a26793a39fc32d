//! Gamepad collector backed by gilrs
//!
//! Runs on a blocking tokio task and turns gilrs events for the bound gamepad
//! into [`ControllerState`] snapshots. The newest snapshot is published on a
//! `watch` channel (`None` while no gamepad is bound), hot-plug activity goes
//! out as [`DeviceEvent`]s on an `mpsc` channel.
//!
//! ## Binding
//!
//! The wanted device name comes from the active skin. With a name, only a
//! gamepad reporting exactly that name (ASCII case-insensitive) is bound;
//! without one, the first connected gamepad is. The name can be changed at
//! runtime through [`DeviceHandle::rebind`].
//!
//! ## Layout
//!
//! Buttons and axes are laid out in the fixed orders of [`BUTTON_ORDER`] and
//! [`AXIS_ORDER`]. Stick Y axes are flipped so that down is positive, matching
//! screen coordinates.

use super::state::ControllerState;
use chrono::{DateTime, Local};
use gilrs::{Axis, Button, Event, EventType, GamepadId, Gilrs};
use statum::{machine, state};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

pub const BUTTON_ORDER: [Button; 17] = [
    Button::South,
    Button::East,
    Button::West,
    Button::North,
    Button::LeftTrigger,
    Button::RightTrigger,
    Button::LeftTrigger2,
    Button::RightTrigger2,
    Button::Select,
    Button::Start,
    Button::Mode,
    Button::LeftThumb,
    Button::RightThumb,
    Button::DPadUp,
    Button::DPadDown,
    Button::DPadLeft,
    Button::DPadRight,
];

pub const AXIS_ORDER: [Axis; 6] = [
    Axis::LeftStickX,
    Axis::LeftStickY,
    Axis::RightStickX,
    Axis::RightStickY,
    Axis::LeftZ,
    Axis::RightZ,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEventKind {
    Connected,
    Disconnected,
    Bound,
    Unbound,
}

/// Hot-plug notification with a wall-clock timestamp
#[derive(Debug, Clone)]
pub struct DeviceEvent {
    pub kind: DeviceEventKind,
    pub name: String,
    pub at: DateTime<Local>,
}

impl DeviceEvent {
    fn now(kind: DeviceEventKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            at: Local::now(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CollectorSettings {
    pub deadzone: f32,
    pub device_name: Option<String>,
    pub poll_interval: Duration,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            deadzone: 0.05,
            device_name: None,
            poll_interval: Duration::from_millis(1),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("Failed to initialize gamepad backend: {0}")]
    Initialization(String),

    #[error("Collector channel closed: {0}")]
    Channel(String),
}

#[state]
#[derive(Debug, Clone)]
pub enum CollectionState {
    Initializing,
    Collecting,
}

#[machine]
#[derive(Debug)]
pub struct DeviceCollector<S: CollectionState> {
    gilrs: Gilrs,
    bound: Option<GamepadId>,
    settings: CollectorSettings,
    state_sender: watch::Sender<Option<ControllerState>>,
    event_sender: mpsc::Sender<DeviceEvent>,
    wanted: watch::Receiver<Option<String>>,
}

impl<S: CollectionState> DeviceCollector<S> {
    fn emit(&self, kind: DeviceEventKind, name: &str) {
        if let Err(e) = self.event_sender.try_send(DeviceEvent::now(kind, name)) {
            debug!("Dropping device event {:?}: {}", kind, e);
        }
    }

    /// Binds the best candidate among connected gamepads, if any
    fn bind_best(&mut self) {
        let wanted = self.wanted.borrow().clone();
        let candidates: Vec<(GamepadId, String)> = self
            .gilrs
            .gamepads()
            .filter(|(_, gamepad)| gamepad.is_connected())
            .map(|(id, gamepad)| (id, gamepad.name().to_owned()))
            .collect();

        let picked = pick_device(
            candidates.iter().map(|(_, name)| name.as_str()),
            wanted.as_deref(),
        );
        match picked.map(|index| &candidates[index]) {
            Some((id, name)) => {
                info!("Bound gamepad {} ({})", name, id);
                self.bound = Some(*id);
                self.emit(DeviceEventKind::Bound, name);
                self.publish_current();
            }
            None => {
                warn!(
                    "No gamepad matches {:?} among {} connected, running in preview mode",
                    wanted,
                    candidates.len()
                );
                self.bound = None;
                publish(&self.state_sender, None);
            }
        }
    }

    fn publish_current(&self) {
        let Some(id) = self.bound else {
            return;
        };
        let gamepad = self.gilrs.gamepad(id);
        let snapshot = build_snapshot(
            |button| gamepad.is_pressed(button),
            |axis| gamepad.value(axis),
            self.settings.deadzone,
        );
        publish(&self.state_sender, Some(snapshot));
    }
}

impl DeviceCollector<Initializing> {
    pub fn create(
        settings: CollectorSettings,
        state_sender: watch::Sender<Option<ControllerState>>,
        event_sender: mpsc::Sender<DeviceEvent>,
        wanted: watch::Receiver<Option<String>>,
    ) -> Result<Self, DeviceError> {
        info!("Initializing gilrs gamepad backend");
        let gilrs = Gilrs::new().map_err(|e| {
            error!("Failed to initialize gilrs: {}", e);
            DeviceError::Initialization(e.to_string())
        })?;
        debug!("Creating device collector with {:?}", settings);
        Ok(Self::new(gilrs, None, settings, state_sender, event_sender, wanted))
    }

    pub fn initialize(mut self) -> DeviceCollector<Collecting> {
        for (id, gamepad) in self.gilrs.gamepads() {
            info!("  Found gamepad {}: {} ({:?})", id, gamepad.name(), gamepad.uuid());
        }
        self.wanted.mark_unchanged();
        self.bind_best();
        self.transition()
    }
}

impl DeviceCollector<Collecting> {
    /// Polls until every state receiver is gone
    pub fn run_collection_loop(&mut self) -> Result<(), DeviceError> {
        info!("Starting device collection loop");
        loop {
            if self.state_sender.is_closed() {
                info!("All state receivers dropped, stopping device collector");
                return Ok(());
            }

            match self.wanted.has_changed() {
                Ok(true) => {
                    self.wanted.mark_unchanged();
                    if let Some(id) = self.bound.take() {
                        let name = self.gilrs.gamepad(id).name().to_owned();
                        self.emit(DeviceEventKind::Unbound, &name);
                    }
                    self.bind_best();
                }
                Ok(false) => {}
                Err(_) => return Err(DeviceError::Channel("rebind sender dropped".into())),
            }

            let mut touched = false;
            while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
                touched |= self.handle_event(id, event);
            }
            if touched {
                self.publish_current();
            }

            std::thread::sleep(self.settings.poll_interval);
        }
    }

    /// Returns whether the bound gamepad's state may have changed
    fn handle_event(&mut self, id: GamepadId, event: EventType) -> bool {
        match event {
            EventType::Connected => {
                let name = self.gilrs.gamepad(id).name().to_owned();
                info!("Gamepad connected: {} ({})", name, id);
                self.emit(DeviceEventKind::Connected, &name);
                if self.bound.is_none() {
                    self.bind_best();
                }
                false
            }
            EventType::Disconnected => {
                let name = self.gilrs.gamepad(id).name().to_owned();
                warn!("Gamepad disconnected: {} ({})", name, id);
                self.emit(DeviceEventKind::Disconnected, &name);
                if self.bound == Some(id) {
                    self.bound = None;
                    self.emit(DeviceEventKind::Unbound, &name);
                    self.bind_best();
                }
                false
            }
            _ if self.bound == Some(id) => {
                debug!("Gamepad event {:?}", event);
                true
            }
            _ => false,
        }
    }
}

/// Owner side of a running collector
#[derive(Debug)]
pub struct DeviceHandle {
    states: watch::Receiver<Option<ControllerState>>,
    events: mpsc::Receiver<DeviceEvent>,
    wanted: watch::Sender<Option<String>>,
}

impl DeviceHandle {
    /// Starts the collector on a blocking task; returns once gilrs is up
    pub async fn spawn(settings: CollectorSettings) -> Result<Self, DeviceError> {
        info!("Spawning device collector with {:?}", settings);
        let (state_tx, states) = watch::channel(None);
        let (event_tx, events) = mpsc::channel(64);
        let (wanted, wanted_rx) = watch::channel(settings.device_name.clone());
        let (ready_tx, ready_rx) = oneshot::channel();

        tokio::task::spawn_blocking(move || {
            let collector = match DeviceCollector::create(settings, state_tx, event_tx, wanted_rx) {
                Ok(collector) => {
                    let _ = ready_tx.send(Ok(()));
                    collector
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            let mut collecting = collector.initialize();
            if let Err(e) = collecting.run_collection_loop() {
                error!("Device collector terminated: {}", e);
            }
        });

        ready_rx
            .await
            .map_err(|_| DeviceError::Channel("collector exited during startup".into()))??;
        info!("Device collector running");
        Ok(Self {
            states,
            events,
            wanted,
        })
    }

    /// A handle with no collector behind it; always reports no device
    pub fn detached() -> Self {
        let (_, states) = watch::channel(None);
        let (_, events) = mpsc::channel(1);
        let (wanted, _) = watch::channel(None);
        Self {
            states,
            events,
            wanted,
        }
    }

    pub fn latest(&self) -> Option<ControllerState> {
        self.states.borrow().clone()
    }

    pub fn try_next_event(&mut self) -> Option<DeviceEvent> {
        self.events.try_recv().ok()
    }

    /// Changes which device name the collector binds to
    pub fn rebind(&self, device_name: Option<String>) {
        self.wanted.send_if_modified(|current| {
            if *current == device_name {
                return false;
            }
            *current = device_name;
            true
        });
    }
}

/// Publishes a snapshot if it differs from the current one
pub fn publish(
    sender: &watch::Sender<Option<ControllerState>>,
    snapshot: Option<ControllerState>,
) -> bool {
    sender.send_if_modified(|current| {
        if *current == snapshot {
            return false;
        }
        *current = snapshot;
        true
    })
}

/// Index of the device to bind among `names`
pub fn pick_device<'a>(
    mut names: impl Iterator<Item = &'a str>,
    wanted: Option<&str>,
) -> Option<usize> {
    match wanted {
        Some(wanted) => names.position(|name| name.eq_ignore_ascii_case(wanted)),
        None => names.next().map(|_| 0),
    }
}

pub fn build_snapshot(
    pressed: impl Fn(Button) -> bool,
    value: impl Fn(Axis) -> f32,
    deadzone: f32,
) -> ControllerState {
    let buttons = BUTTON_ORDER.iter().map(|button| pressed(*button)).collect();
    let axes = AXIS_ORDER
        .iter()
        .map(|axis| {
            let raw = apply_deadzone(value(*axis), deadzone);
            match axis {
                Axis::LeftStickY | Axis::RightStickY => -raw,
                _ => raw,
            }
        })
        .collect();
    ControllerState::new(buttons, axes)
}

/// Largest usable deadzone; anything wider would leave no travel to rescale
pub const MAX_DEADZONE: f32 = 0.99;

/// Zeroes values inside the deadzone and rescales the rest back to [-1, 1].
/// The deadzone is clamped to `[0, MAX_DEADZONE]`.
pub fn apply_deadzone(value: f32, deadzone: f32) -> f32 {
    let deadzone = if deadzone.is_finite() {
        deadzone.clamp(0.0, MAX_DEADZONE)
    } else {
        0.0
    };
    if value.abs() < deadzone {
        0.0
    } else {
        let sign = if value < 0.0 { -1.0 } else { 1.0 };
        sign * (value.abs() - deadzone) / (1.0 - deadzone)
    }
}
