//! Engine context: the one place that knows which skin is active
//!
//! Owned by the viewer (or the headless loop). Holds the active skin, the
//! current device binding, per-skin window sizes and the remaps the user can
//! pick from. Nothing in here touches disk except loading skins; settings come
//! in from [`AppConfig`] and go back out through [`EngineContext::export_into`].

use crate::config::{AppConfig, WindowSize};
use crate::controller::{DeviceEvent, DeviceEventKind};
use crate::skin::{ColorRemap, Skin, SkinError, SkinKind, Surface};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DeviceBinding {
    Bound(String),
    /// Preview mode: the skin is drawn in its idle state
    #[default]
    NoDeviceBound,
}

impl DeviceBinding {
    /// Follows a hot-plug event; returns whether the binding changed
    pub fn apply(&mut self, event: &DeviceEvent) -> bool {
        let next = match event.kind {
            DeviceEventKind::Bound => Self::Bound(event.name.clone()),
            DeviceEventKind::Unbound => Self::NoDeviceBound,
            DeviceEventKind::Connected | DeviceEventKind::Disconnected => return false,
        };
        if *self == next {
            return false;
        }
        *self = next;
        true
    }

    pub fn is_bound(&self) -> bool {
        matches!(self, Self::Bound(_))
    }
}

#[derive(Debug, Default)]
pub struct EngineContext {
    skin: Option<SkinKind>,
    binding: DeviceBinding,
    window_sizes: HashMap<PathBuf, (u32, u32)>,
    remaps: Vec<ColorRemap>,
    selected_remaps: HashMap<PathBuf, String>,
}

impl EngineContext {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            skin: None,
            binding: DeviceBinding::NoDeviceBound,
            window_sizes: config
                .window_sizes
                .iter()
                .map(|(path, size)| (PathBuf::from(path), (size.width, size.height)))
                .collect(),
            remaps: config.remaps.clone(),
            selected_remaps: config
                .selected_remaps
                .iter()
                .map(|(path, name)| (PathBuf::from(path), name.clone()))
                .collect(),
        }
    }

    /// Writes window sizes and remap selections back into `config`
    pub fn export_into(&self, config: &mut AppConfig) {
        for (path, (width, height)) in &self.window_sizes {
            config.window_sizes.insert(
                path.display().to_string(),
                WindowSize {
                    width: *width,
                    height: *height,
                },
            );
        }
        config.selected_remaps = self
            .selected_remaps
            .iter()
            .map(|(path, name)| (path.display().to_string(), name.clone()))
            .collect();
        if let Some(skin) = &self.skin {
            config.skin = Some(skin.path().to_path_buf());
        }
    }

    pub fn skin(&self) -> Option<&SkinKind> {
        self.skin.as_ref()
    }

    pub fn skin_mut(&mut self) -> Option<&mut SkinKind> {
        self.skin.as_mut()
    }

    pub fn binding(&self) -> &DeviceBinding {
        &self.binding
    }

    pub fn remaps(&self) -> &[ColorRemap] {
        &self.remaps
    }

    /// Opens and activates `path`. The previous skin stays active if it fails.
    pub fn activate_skin(
        &mut self,
        path: &Path,
        surface: &mut dyn Surface,
    ) -> Result<(), SkinError> {
        let mut fresh = SkinKind::open(path)?;
        if let Some(mut previous) = self.skin.take() {
            previous.deactivate(surface);
        }
        self.restore_remap(&mut fresh);
        fresh.activate();
        info!(
            "Activated skin {} (device {:?})",
            path.display(),
            fresh.device_name()
        );
        self.skin = Some(fresh);
        Ok(())
    }

    /// Reloads the active skin from disk, keeping its remap
    pub fn reload_active(&mut self, surface: &mut dyn Surface) -> Result<(), SkinError> {
        let Some(current) = &self.skin else {
            return Ok(());
        };
        let mut fresh = current.try_clone()?;
        if let Some(mut previous) = self.skin.take() {
            previous.deactivate(surface);
        }
        self.restore_remap(&mut fresh);
        fresh.activate();
        info!("Reloaded skin {}", fresh.path().display());
        self.skin = Some(fresh);
        Ok(())
    }

    fn restore_remap(&self, skin: &mut SkinKind) {
        let Some(name) = self.selected_remaps.get(skin.path()) else {
            return;
        };
        match self.remaps.iter().find(|remap| &remap.name == name) {
            Some(remap) => {
                skin.apply_remap(remap.clone());
            }
            None => warn!("Selected remap {:?} no longer exists", name),
        }
    }

    /// Applies the named remap to the active skin and remembers the choice
    pub fn select_remap(&mut self, name: &str) -> bool {
        let Some(remap) = self.remaps.iter().find(|remap| remap.name == name).cloned() else {
            warn!("Unknown remap {:?}", name);
            return false;
        };
        let Some(skin) = &mut self.skin else {
            return false;
        };
        if !skin.apply_remap(remap) {
            return false;
        }
        self.selected_remaps
            .insert(skin.path().to_path_buf(), name.to_owned());
        true
    }

    pub fn clear_remap(&mut self) {
        if let Some(skin) = &mut self.skin {
            skin.clear_remap();
            self.selected_remaps.remove(skin.path());
        }
    }

    /// Stored window size for the active skin, else its declared size
    pub fn window_size(&self) -> Option<(u32, u32)> {
        let skin = self.skin.as_ref()?;
        Some(
            self.window_sizes
                .get(skin.path())
                .copied()
                .unwrap_or_else(|| skin.default_size()),
        )
    }

    pub fn record_window_size(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        if let Some(skin) = &self.skin {
            self.window_sizes
                .insert(skin.path().to_path_buf(), (width, height));
        }
    }

    /// Updates the binding from a hot-plug event; returns whether it changed
    pub fn apply_device_event(&mut self, event: &DeviceEvent) -> bool {
        let changed = self.binding.apply(event);
        if changed {
            info!("Device binding is now {:?}", self.binding);
        }
        changed
    }
}
