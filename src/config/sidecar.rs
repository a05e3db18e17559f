// src/config/sidecar.rs

//! Per-entry sidecar configuration (`entry.toml`).
//!
//! ```toml
//! name = "Space Dodge"
//! thumbnail = "thumb.png"
//! kind = "script"
//! isolated = true
//! runtime_version = "3.11"
//! ```
//!
//! Every field is optional:
//!
//! | field             | default                                             |
//! |-------------------|-----------------------------------------------------|
//! | `name`            | the entry's directory name                          |
//! | `thumbnail`       | none (the shared default image is shown)            |
//! | `kind`            | `script` if `main.py` exists, otherwise `binary`    |
//! | `isolated`        | `true` iff `requirements.txt` exists                |
//! | `runtime_version` | none (any runtime)                                  |

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::{KioskError, Result};
use crate::fs::FileSystem;
use crate::runtime::normalize_version;
use crate::types::RunKind;

pub const SIDECAR_FILE: &str = "entry.toml";
pub const MANIFEST_FILE: &str = "requirements.txt";

/// Sidecar exactly as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RawSidecar {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isolated: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_version: Option<String>,
}

/// What the scanner found in an entry directory before reading the sidecar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirProbe {
    pub has_script: bool,
    pub has_binary: bool,
    pub has_manifest: bool,
}

impl DirProbe {
    pub fn inspect(fs: &dyn FileSystem, dir: &Path) -> Self {
        Self {
            has_script: fs.is_file(&dir.join(RunKind::Script.target_file())),
            has_binary: fs.is_file(&dir.join(RunKind::Binary.target_file())),
            has_manifest: fs.is_file(&dir.join(MANIFEST_FILE)),
        }
    }

    pub fn has_launch_target(&self) -> bool {
        self.has_script || self.has_binary
    }

    fn inferred_kind(&self) -> RunKind {
        if self.has_script {
            RunKind::Script
        } else {
            RunKind::Binary
        }
    }

    fn has_target(&self, kind: RunKind) -> bool {
        match kind {
            RunKind::Script => self.has_script,
            RunKind::Binary => self.has_binary,
        }
    }
}

/// Validated entry configuration with every default applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryConfig {
    pub display_name: String,
    /// Thumbnail path relative to the entry directory.
    pub thumbnail: Option<PathBuf>,
    pub run_kind: RunKind,
    pub requires_isolated_env: bool,
    /// Normalized `major.minor` constraint.
    pub runtime_version: Option<String>,
}

/// Whether the sidecar was read or had to be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidecarStatus {
    Loaded,
    Repaired,
}

/// Defaults for an entry directory, as written when the sidecar is missing.
pub fn default_sidecar(id: &str, probe: &DirProbe) -> RawSidecar {
    RawSidecar {
        name: Some(id.to_string()),
        thumbnail: None,
        kind: Some(probe.inferred_kind().as_str().to_string()),
        isolated: Some(probe.has_manifest),
        runtime_version: None,
    }
}

/// Load `entry.toml` from `dir`, writing defaults when it is missing.
///
/// A present-but-unusable sidecar yields [`KioskError::ConfigMalformed`];
/// the caller skips the entry.
pub fn load_sidecar(
    fs: &dyn FileSystem,
    dir: &Path,
    id: &str,
    probe: &DirProbe,
) -> Result<(EntryConfig, SidecarStatus)> {
    let path = dir.join(SIDECAR_FILE);

    if !fs.exists(&path) {
        let defaults = default_sidecar(id, probe);
        info!(
            entry = %id,
            reason = %KioskError::ConfigMissing(path.clone()),
            "repairing sidecar"
        );
        match toml::to_string(&defaults) {
            Ok(text) => {
                if let Err(err) = fs.write(&path, text.as_bytes()) {
                    warn!(entry = %id, error = %err, "could not persist default sidecar");
                }
            }
            Err(err) => warn!(entry = %id, error = %err, "could not serialize default sidecar"),
        }
        let config = validate_sidecar(defaults, id, probe).map_err(|reason| malformed(&path, reason))?;
        return Ok((config, SidecarStatus::Repaired));
    }

    let text = fs
        .read_to_string(&path)
        .map_err(|e| malformed(&path, format!("unreadable: {e:#}")))?;
    let raw: RawSidecar =
        toml::from_str(&text).map_err(|e| malformed(&path, e.message().to_string()))?;
    let config = validate_sidecar(raw, id, probe).map_err(|reason| malformed(&path, reason))?;
    Ok((config, SidecarStatus::Loaded))
}

fn malformed(path: &Path, reason: String) -> KioskError {
    KioskError::ConfigMalformed {
        path: path.to_path_buf(),
        reason,
    }
}

/// Apply defaults and check the sidecar against the directory contents.
pub fn validate_sidecar(
    raw: RawSidecar,
    id: &str,
    probe: &DirProbe,
) -> std::result::Result<EntryConfig, String> {
    let display_name = match raw.name {
        Some(name) if name.trim().is_empty() => return Err("name must not be empty".to_string()),
        Some(name) => name.trim().to_string(),
        None => id.to_string(),
    };

    let run_kind = match raw.kind {
        Some(kind) => kind.parse::<RunKind>()?,
        None => probe.inferred_kind(),
    };
    if !probe.has_target(run_kind) {
        return Err(format!(
            "kind = \"{}\" but {} is missing",
            run_kind.as_str(),
            run_kind.target_file()
        ));
    }

    let runtime_version = match raw.runtime_version {
        Some(v) => Some(normalize_version(&v)?),
        None => None,
    };

    let thumbnail = match raw.thumbnail {
        Some(t) if t.trim().is_empty() => None,
        Some(t) => Some(PathBuf::from(t.trim())),
        None => None,
    };

    Ok(EntryConfig {
        display_name,
        thumbnail,
        run_kind,
        requires_isolated_env: raw.isolated.unwrap_or(probe.has_manifest),
        runtime_version,
    })
}
