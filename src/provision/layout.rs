// src/provision/layout.rs

//! On-disk shape of an isolated environment.
//!
//! `<entry>/.venv/` holds the environment; `<entry>/.venv/.kiosk-manifest`
//! records the blake3 digest of the manifest it was built from. An
//! environment whose digest no longer matches is stale.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::fs::FileSystem;
use crate::runtime::{normalize_version, RuntimeHandle};

pub const ENV_DIR: &str = ".venv";
pub const MARKER_FILE: &str = ".kiosk-manifest";

pub fn env_dir(entry_dir: &Path) -> PathBuf {
    entry_dir.join(ENV_DIR)
}

/// Interpreter inside an environment directory.
pub fn env_interpreter(env_dir: &Path) -> PathBuf {
    if cfg!(windows) {
        env_dir.join("Scripts").join("python.exe")
    } else {
        env_dir.join("bin").join("python")
    }
}

pub fn marker_path(env_dir: &Path) -> PathBuf {
    env_dir.join(MARKER_FILE)
}

pub fn manifest_digest(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// Whether `entry_dir` holds a complete environment built from `manifest`.
pub fn is_provisioned(fs: &dyn FileSystem, entry_dir: &Path, manifest: Option<&Path>) -> bool {
    let env = env_dir(entry_dir);
    if !fs.is_file(&env_interpreter(&env)) {
        return false;
    }
    let Some(manifest) = manifest else {
        return true;
    };

    let (Ok(recorded), Ok(current)) = (
        fs.read_to_string(&marker_path(&env)),
        fs.read(manifest),
    ) else {
        debug!(entry = ?entry_dir, "environment has no readable manifest marker");
        return false;
    };

    let fresh = recorded.trim() == manifest_digest(&current);
    if !fresh {
        debug!(entry = ?entry_dir, "environment is stale (manifest changed)");
    }
    fresh
}

/// Handle for the environment's own interpreter, if it exists.
///
/// The version comes from `pyvenv.cfg` when readable; it is informational
/// only, so an unreadable file leaves it empty.
pub fn environment_handle(entry_dir: &Path) -> Option<RuntimeHandle> {
    let env = env_dir(entry_dir);
    let path = env_interpreter(&env);
    if !path.is_file() {
        return None;
    }
    let reported_version = fs::read_to_string(env.join("pyvenv.cfg"))
        .ok()
        .and_then(|cfg| pyvenv_version(&cfg))
        .unwrap_or_default();
    Some(RuntimeHandle {
        path,
        reported_version,
    })
}

fn pyvenv_version(cfg: &str) -> Option<String> {
    cfg.lines().find_map(|line| {
        let (key, value) = line.split_once('=')?;
        match key.trim() {
            "version" | "version_info" => normalize_version(value).ok(),
            _ => None,
        }
    })
}
