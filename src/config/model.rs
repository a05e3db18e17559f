// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::net::MonitorOptions;
use crate::runtime::ResolverOptions;
use crate::supervise::SupervisorOptions;
use crate::types::DeviceMode;

/// Launcher configuration as read from `Kiosk.toml`.
///
/// ```toml
/// [catalog]
/// root = "games"
///
/// [session]
/// fps = 60
/// notification_ttl = "4s"
///
/// [network]
/// probe_addr = "1.1.1.1:53"
/// poll_interval = "3s"
///
/// [supervisor]
/// benign_stderr = ["^ALSA lib "]
/// ```
///
/// Every section is optional. Use [`KioskConfig`] (via `TryFrom`) for
/// anything beyond deserialization.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawKioskConfig {
    #[serde(default)]
    pub catalog: CatalogSection,

    #[serde(default)]
    pub session: SessionSection,

    #[serde(default)]
    pub network: NetworkSection,

    #[serde(default)]
    pub runtime: RuntimeSection,

    #[serde(default)]
    pub supervisor: SupervisorSection,
}

/// `[catalog]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogSection {
    /// Directory holding one subdirectory per entry.
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Directory for the launcher's own images and sounds.
    #[serde(default = "default_assets")]
    pub assets: PathBuf,
}

fn default_root() -> PathBuf {
    PathBuf::from("games")
}

fn default_assets() -> PathBuf {
    PathBuf::from("assets")
}

impl Default for CatalogSection {
    fn default() -> Self {
        Self {
            root: default_root(),
            assets: default_assets(),
        }
    }
}

/// `[session]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionSection {
    #[serde(default = "default_fps")]
    pub fps: u32,

    /// How long crash notifications stay on screen (e.g. `"4s"`).
    #[serde(default = "default_notification_ttl")]
    pub notification_ttl: String,

    /// Skip the startup logo animation.
    #[serde(default)]
    pub skip_boot: bool,

    /// Session log file, truncated at startup. Empty string disables it.
    #[serde(default = "default_session_log")]
    pub session_log: String,
}

fn default_fps() -> u32 {
    60
}

fn default_notification_ttl() -> String {
    "4s".to_string()
}

fn default_session_log() -> String {
    "session.log".to_string()
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            notification_ttl: default_notification_ttl(),
            skip_boot: false,
            session_log: default_session_log(),
        }
    }
}

/// `[network]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkSection {
    /// `host:port` that a TCP connect is attempted against.
    #[serde(default = "default_probe_addr")]
    pub probe_addr: String,

    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,

    #[serde(default = "default_net_timeout")]
    pub probe_timeout: String,
}

fn default_probe_addr() -> String {
    "1.1.1.1:53".to_string()
}

fn default_poll_interval() -> String {
    "3s".to_string()
}

fn default_net_timeout() -> String {
    "2s".to_string()
}

impl Default for NetworkSection {
    fn default() -> Self {
        Self {
            probe_addr: default_probe_addr(),
            poll_interval: default_poll_interval(),
            probe_timeout: default_net_timeout(),
        }
    }
}

/// `[runtime]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeSection {
    #[serde(default = "default_runtime_probe_timeout")]
    pub probe_timeout: String,

    #[serde(default = "default_install_timeout")]
    pub install_timeout: String,

    /// Version manager executable; empty string disables the strategy.
    #[serde(default = "default_version_manager")]
    pub version_manager: String,

    /// Platform launcher executable; empty string disables the strategy.
    #[serde(default = "default_launcher")]
    pub launcher: String,

    /// Overrides the host's well-known install locations.
    #[serde(default)]
    pub common_locations: Option<Vec<PathBuf>>,
}

fn default_runtime_probe_timeout() -> String {
    "5s".to_string()
}

fn default_install_timeout() -> String {
    "15m".to_string()
}

fn default_version_manager() -> String {
    "pyenv".to_string()
}

fn default_launcher() -> String {
    "py".to_string()
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self {
            probe_timeout: default_runtime_probe_timeout(),
            install_timeout: default_install_timeout(),
            version_manager: default_version_manager(),
            launcher: default_launcher(),
            common_locations: None,
        }
    }
}

/// `[supervisor]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SupervisorSection {
    /// Regexes for final stderr lines that do not count as a crash.
    #[serde(default = "default_benign_stderr")]
    pub benign_stderr: Vec<String>,

    /// Delay before raising the child's window; empty string disables it.
    #[serde(default = "default_raise_window_after")]
    pub raise_window_after: String,

    #[serde(default)]
    pub device_mode: DeviceMode,

    /// Extra variables set on every child, applied after the device overlay.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

pub fn default_benign_stderr() -> Vec<String> {
    [
        r"^ALSA lib ",
        r"^libEGL warning",
        r"^MESA-LOADER",
        r"DeprecationWarning",
        r"pkg_resources is deprecated",
        r"^\s*warnings\.warn\(",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_raise_window_after() -> String {
    "1s".to_string()
}

impl Default for SupervisorSection {
    fn default() -> Self {
        Self {
            benign_stderr: default_benign_stderr(),
            raise_window_after: default_raise_window_after(),
            device_mode: DeviceMode::default(),
            env: BTreeMap::new(),
        }
    }
}

/// Validated launcher configuration.
///
/// Durations are parsed, regexes compiled, and each component receives its
/// own ready-to-use options struct.
#[derive(Debug, Clone)]
pub struct KioskConfig {
    pub catalog_root: PathBuf,
    pub assets_dir: PathBuf,
    pub session: SessionSettings,
    pub network: MonitorOptions,
    pub runtime: ResolverOptions,
    pub supervisor: SupervisorOptions,
}

/// Validated `[session]` values.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub fps: u32,
    pub notification_ttl: Duration,
    pub skip_boot: bool,
    pub session_log: Option<PathBuf>,
}

impl SessionSettings {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.fps
    }

    /// Notification lifetime expressed in frames (at least one).
    pub fn notification_ttl_ticks(&self) -> u64 {
        let ticks = self.notification_ttl.as_millis() * u128::from(self.fps) / 1000;
        (ticks as u64).max(1)
    }
}
