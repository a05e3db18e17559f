// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! Component boundaries (provisioning, supervision) convert these into typed
//! outcomes; only startup code lets them escape to `main`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum KioskError {
    /// Launcher configuration is unusable (fatal at startup).
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An entry's sidecar did not exist; it was written with defaults.
    #[error("sidecar config missing at {0:?}; defaults written")]
    ConfigMissing(PathBuf),

    /// An entry's sidecar exists but cannot be used; the entry is skipped.
    #[error("malformed sidecar config {path:?}: {reason}")]
    ConfigMalformed { path: PathBuf, reason: String },

    #[error("no runtime found satisfying {0}")]
    RuntimeNotFound(String),

    #[error("network unavailable")]
    NetworkUnavailable,

    #[error("install failed: {0}")]
    InstallFailed(String),

    #[error("child crashed: {0}")]
    ChildCrashed(String),

    #[error("failed to start child: {0}")]
    ChildSpawnFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, KioskError>;
