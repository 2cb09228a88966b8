//! Application configuration.
//!
//! The configuration is loaded from `$XDG_CONFIG_HOME/screenkeep/config.json`
//! when it exists.  Every field is optional; a missing file or a minimal
//! `{}` gives the compiled-in defaults.
//!
//! # Example
//!
//! ```json
//! {
//!   "store_path": "/home/me/.saved-outputs-positions.json",
//!   "xrandr": "/usr/bin/xrandr",
//!   "i3_msg": "i3-msg",
//!   "edid_root": "/sys/class/drm"
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Identity store file.  Defaults to
    /// `$HOME/.saved-outputs-positions.json`.
    pub store_path: Option<PathBuf>,
    /// Display-configuration tool.
    pub xrandr: String,
    /// i3 IPC tool.
    pub i3_msg: String,
    /// Directory holding one sub-directory per DRM connector.
    pub edid_root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: None,
            xrandr: "xrandr".into(),
            i3_msg: "i3-msg".into(),
            edid_root: PathBuf::from("/sys/class/drm"),
        }
    }
}

/// Error from loading or parsing a configuration file.
#[derive(Debug, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(String);

impl Config {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| ConfigError(format!("failed to parse {}: {}", path.display(), e)))?;
        Ok(config)
    }

    /// The store file, falling back to `<home>/.saved-outputs-positions.json`.
    pub fn store_path(&self, home: &Path) -> PathBuf {
        self.store_path
            .clone()
            .unwrap_or_else(|| home.join(".saved-outputs-positions.json"))
    }
}
