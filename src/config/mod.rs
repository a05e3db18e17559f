// src/config/mod.rs

//! Configuration loading and validation.
//!
//! Responsibilities:
//! - Launcher-wide settings from `Kiosk.toml` (`model.rs`, `loader.rs`,
//!   `validate.rs`).
//! - Per-entry sidecars (`sidecar.rs`), including writing defaults for
//!   entries that have none.

pub mod loader;
pub mod model;
pub mod sidecar;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{KioskConfig, RawKioskConfig, SessionSettings};
pub use sidecar::{load_sidecar, DirProbe, EntryConfig, RawSidecar, SidecarStatus};
pub use validate::parse_duration;
