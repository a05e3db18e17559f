// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::model::{KioskConfig, RawKioskConfig};
use crate::errors::Result;

/// Load a launcher configuration file and return the raw `RawKioskConfig`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawKioskConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawKioskConfig = toml::from_str(&contents)?;

    Ok(config)
}

/// Load and validate the launcher configuration.
///
/// A missing file is not an error on a kiosk: every setting has a default,
/// so the built-in defaults are validated and returned instead.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<KioskConfig> {
    let path = path.as_ref();
    let raw = if path.exists() {
        load_from_path(path)?
    } else {
        info!(config = ?path, "launcher config not found; using defaults");
        RawKioskConfig::default()
    };
    KioskConfig::try_from(raw)
}

/// Default launcher config location: `Kiosk.toml` in the working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Kiosk.toml")
}
