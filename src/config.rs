//! Application settings, read from `<config dir>/padskin/config.toml`
//!
//! Every field has a default, so a partial file (or none at all) is fine. A
//! file that exists but does not parse is reported instead of silently
//! ignored.

use crate::skin::ColorRemap;
use egui::Color32;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("No configuration directory on this platform")]
    NoConfigDir,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Skin opened at startup
    pub skin: Option<PathBuf>,
    pub max_fps: u32,
    /// Redraw at least this often even without input changes
    pub forced_refresh_ms: u64,
    /// Quiet window for coalescing hot-plug rebuilds
    pub debounce_ms: u64,
    /// Clear color behind the skin
    pub background: Color32,
    /// Button whose press is forwarded as an edge signal
    pub edge_signal_button: Option<usize>,
    pub deadzone: f32,
    /// Last window size per skin path
    pub window_sizes: BTreeMap<String, WindowSize>,
    pub remaps: Vec<ColorRemap>,
    /// Selected remap name per skin path
    pub selected_remaps: BTreeMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            skin: None,
            max_fps: 60,
            forced_refresh_ms: 200,
            debounce_ms: 300,
            background: Color32::BLACK,
            edge_signal_button: None,
            deadzone: 0.05,
            window_sizes: BTreeMap::new(),
            remaps: Vec::new(),
            selected_remaps: BTreeMap::new(),
        }
    }
}

impl AppConfig {
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join("padskin").join("config.toml"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Reads `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded config from {}: {:?}", path.display(), config);
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let text = toml::to_string_pretty(self)?;
        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        std::fs::write(path, text).map_err(io_error)?;
        info!("Saved config to {}", path.display());
        Ok(())
    }

    pub fn forced_refresh(&self) -> Duration {
        Duration::from_millis(self.forced_refresh_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
