//! Settings parser for the engine's config.toml

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use drydock_core::prelude::*;

const CONFIG_FILENAME: &str = "config.toml";
const DRYDOCK_DIR: &str = "drydock";

/// Engine settings, all defaulted; loaded from the user config directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineSettings {
    pub playback: PlaybackSettings,
    pub session: SessionSettings,
}

/// Playback cadence settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Per-character reveal interval in milliseconds
    pub tick_ms: u64,

    /// Blank rows reserved beneath the log once the session completed, so
    /// the follow-up call-to-action never obscures the last line
    pub success_padding_lines: u16,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            tick_ms: 10,
            success_padding_lines: 3,
        }
    }
}

impl PlaybackSettings {
    pub fn tick(&self) -> Duration {
        // A zero interval would make tokio panic; clamp to 1ms
        Duration::from_millis(self.tick_ms.max(1))
    }
}

/// Session lifetime settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Hard session ceiling in seconds; the transport is force-aborted and
    /// the session fails once it elapses
    pub timeout_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self { timeout_secs: 30 * 60 }
    }
}

impl SessionSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl EngineSettings {
    /// Load settings from the default location, falling back to defaults
    /// when no config file exists
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load settings from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Self = toml::from_str(&content)
            .map_err(|e| Error::config_invalid(format!("{}: {e}", path.display())))?;
        debug!("loaded engine settings from {}", path.display());
        Ok(settings)
    }

    /// Default config file location: `<user config dir>/drydock/config.toml`
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(DRYDOCK_DIR).join(CONFIG_FILENAME))
    }
}
