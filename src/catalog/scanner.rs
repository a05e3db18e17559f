// src/catalog/scanner.rs

//! Builds the [`Catalog`] from the entries directory.

use std::path::{Path, PathBuf};

use anyhow::anyhow;
use tracing::{debug, error, info, warn};

use crate::catalog::model::{Catalog, CatalogEntry, Thumbnail};
use crate::config::sidecar::{
    load_sidecar, DirProbe, EntryConfig, RawSidecar, SidecarStatus, MANIFEST_FILE, SIDECAR_FILE,
};
use crate::errors::{KioskError, Result};
use crate::fs::FileSystem;
use crate::present::assets::AssetLoader;
use crate::provision::layout::is_provisioned;
use crate::types::{InstallState, RunKind};

/// Directory name of the entry synthesized into an empty catalog.
pub const PLACEHOLDER_ID: &str = "welcome";

const PLACEHOLDER_SCRIPT: &str = "\
import sys

print(\"Nothing installed yet. Copy an application folder containing main.py \"
      \"or main.bin into the catalog directory and restart the launcher.\")
sys.exit(0)
";

pub struct Scanner<'a> {
    fs: &'a dyn FileSystem,
    assets: &'a dyn AssetLoader,
}

impl<'a> Scanner<'a> {
    pub fn new(fs: &'a dyn FileSystem, assets: &'a dyn AssetLoader) -> Self {
        Self { fs, assets }
    }

    /// Scan `root` and return a non-empty catalog.
    ///
    /// Creates `root` when missing and synthesizes a placeholder entry when
    /// nothing valid is found. Errors only when the directory itself cannot
    /// be created, listed, or populated.
    ///
    /// Every path in the returned catalog is absolute. Children run with
    /// their entry directory as working directory, so a relative root would
    /// resolve twice.
    pub fn scan(&self, root: &Path) -> Result<Catalog> {
        if !self.fs.is_dir(root) {
            info!(root = ?root, "catalog root missing; creating it");
            self.fs.create_dir_all(root)?;
        }
        let root = &self.fs.canonicalize(root)?;

        let mut dirs: Vec<PathBuf> = self
            .fs
            .read_dir(root)?
            .into_iter()
            .filter(|p| self.fs.is_dir(p))
            .collect();
        dirs.sort();

        let mut entries: Vec<CatalogEntry> =
            dirs.iter().filter_map(|dir| self.scan_entry(dir)).collect();

        if entries.is_empty() {
            warn!(root = ?root, "no valid entries found; synthesizing placeholder");
            let dir = self.write_placeholder(root)?;
            entries.extend(self.scan_entry(&dir));
        }

        info!(
            root = ?root,
            count = entries.len(),
            ids = ?entries.iter().map(|e| e.id.as_str()).collect::<Vec<_>>(),
            "catalog scanned"
        );

        Catalog::new(entries)
            .ok_or_else(|| KioskError::Other(anyhow!("catalog at {:?} is unusable", root)))
    }

    fn scan_entry(&self, dir: &Path) -> Option<CatalogEntry> {
        let Some(id) = dir.file_name().and_then(|n| n.to_str()) else {
            warn!(dir = ?dir, "skipping directory with a non UTF-8 name");
            return None;
        };
        if id.starts_with('.') {
            return None;
        }

        let probe = DirProbe::inspect(self.fs, dir);
        if !probe.has_launch_target() {
            debug!(entry = %id, "no main.py or main.bin; not an entry");
            return None;
        }

        let config = match load_sidecar(self.fs, dir, id, &probe) {
            Ok((config, SidecarStatus::Repaired)) => {
                info!(entry = %id, "wrote default sidecar");
                config
            }
            Ok((config, SidecarStatus::Loaded)) => config,
            Err(err) => {
                error!(entry = %id, error = %err, "skipping entry");
                return None;
            }
        };

        Some(self.build_entry(id, dir, &probe, config))
    }

    fn build_entry(
        &self,
        id: &str,
        dir: &Path,
        probe: &DirProbe,
        config: EntryConfig,
    ) -> CatalogEntry {
        let manifest = probe.has_manifest.then(|| dir.join(MANIFEST_FILE));
        let install_state = if !config.requires_isolated_env {
            InstallState::NotRequired
        } else if is_provisioned(self.fs, dir, manifest.as_deref()) {
            InstallState::Installed
        } else {
            InstallState::NotInstalled
        };
        let thumbnail = self.resolve_thumbnail(id, dir, config.thumbnail.as_deref());

        debug!(
            entry = %id,
            kind = config.run_kind.as_str(),
            isolated = config.requires_isolated_env,
            state = ?install_state,
            "entry discovered"
        );

        CatalogEntry {
            id: id.to_string(),
            display_name: config.display_name,
            dir: dir.to_path_buf(),
            launch_target: dir.join(config.run_kind.target_file()),
            thumbnail,
            run_kind: config.run_kind,
            requires_isolated_env: config.requires_isolated_env,
            requested_runtime_version: config.runtime_version,
            manifest,
            install_state,
        }
    }

    fn resolve_thumbnail(&self, id: &str, dir: &Path, thumbnail: Option<&Path>) -> Thumbnail {
        let Some(rel) = thumbnail else {
            return Thumbnail::None;
        };
        let requested = dir.join(rel);
        match self.assets.load_image(&requested) {
            Ok(img) => Thumbnail::Loaded(img),
            Err(err) => {
                warn!(entry = %id, thumbnail = ?requested, error = %err, "thumbnail fallback");
                Thumbnail::Fallback {
                    requested,
                    reason: format!("{err:#}"),
                }
            }
        }
    }

    fn write_placeholder(&self, root: &Path) -> Result<PathBuf> {
        let dir = root.join(PLACEHOLDER_ID);
        let sidecar = RawSidecar {
            name: Some("Welcome".to_string()),
            thumbnail: None,
            kind: Some(RunKind::Script.as_str().to_string()),
            isolated: Some(false),
            runtime_version: None,
        };
        let sidecar = toml::to_string(&sidecar)
            .map_err(|e| KioskError::Other(anyhow!("serializing placeholder sidecar: {e}")))?;

        self.fs.create_dir_all(&dir)?;
        self.fs
            .write(&dir.join(RunKind::Script.target_file()), PLACEHOLDER_SCRIPT.as_bytes())?;
        self.fs.write(&dir.join(SIDECAR_FILE), sidecar.as_bytes())?;
        Ok(dir)
    }
}
