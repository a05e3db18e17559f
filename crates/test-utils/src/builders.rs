#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use kiosk::catalog::{Catalog, CatalogEntry, Scanner, Thumbnail};
use kiosk::fs::RealFileSystem;
use kiosk::present::assets::FsAssetLoader;
use kiosk::types::{InstallState, RunKind};
use std::sync::Arc;
use tempfile::TempDir;

/// Builder for `CatalogEntry` to simplify test setup.
pub struct CatalogEntryBuilder {
    entry: CatalogEntry,
}

impl CatalogEntryBuilder {
    pub fn new(id: &str) -> Self {
        let dir = PathBuf::from("/games").join(id);
        Self {
            entry: CatalogEntry {
                id: id.to_string(),
                display_name: id.to_string(),
                launch_target: dir.join(RunKind::Script.target_file()),
                dir,
                thumbnail: Thumbnail::None,
                run_kind: RunKind::Script,
                requires_isolated_env: false,
                requested_runtime_version: None,
                manifest: None,
                install_state: InstallState::NotRequired,
            },
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.entry.display_name = name.to_string();
        self
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        self.entry.launch_target = dir.join(self.entry.run_kind.target_file());
        if self.entry.manifest.is_some() {
            self.entry.manifest = Some(dir.join("requirements.txt"));
        }
        self.entry.dir = dir;
        self
    }

    pub fn binary(mut self) -> Self {
        self.entry.run_kind = RunKind::Binary;
        self.entry.launch_target = self.entry.dir.join(RunKind::Binary.target_file());
        self
    }

    /// Isolated with a manifest, not yet installed.
    pub fn isolated(mut self) -> Self {
        self.entry.requires_isolated_env = true;
        self.entry.manifest = Some(self.entry.dir.join("requirements.txt"));
        self.entry.install_state = InstallState::NotInstalled;
        self
    }

    pub fn state(mut self, state: InstallState) -> Self {
        self.entry.install_state = state;
        self
    }

    pub fn runtime_version(mut self, version: &str) -> Self {
        self.entry.requested_runtime_version = Some(version.to_string());
        self
    }

    pub fn build(self) -> CatalogEntry {
        self.entry
    }
}

/// A catalog root in a temporary directory.
pub struct TempCatalog {
    _dir: TempDir,
    root: PathBuf,
}

impl TempCatalog {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let root = fs::canonicalize(dir.path()).expect("Failed to resolve temp dir");
        Self { _dir: dir, root }
    }

    /// A catalog under the working directory, addressed by a relative path.
    pub fn relative() -> Self {
        let dir = tempfile::Builder::new()
            .prefix(".kiosk-catalog-")
            .tempdir_in(".")
            .expect("Failed to create temp dir");
        let name = dir.path().file_name().expect("temp dir has a name");
        let root = PathBuf::from(name);
        Self { _dir: dir, root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entry_dir(&self, id: &str) -> PathBuf {
        self.root().join(id)
    }

    /// Write `<root>/<id>/<file>`, creating directories as needed.
    pub fn write(&self, id: &str, file: &str, contents: &str) -> PathBuf {
        let path = self.entry_dir(id).join(file);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create entry dir");
        }
        fs::write(&path, contents).expect("Failed to write entry file");
        path
    }

    pub fn add_script(&self, id: &str, body: &str) -> PathBuf {
        self.write(id, RunKind::Script.target_file(), body)
    }

    /// `main.bin` as an executable shell script.
    #[cfg(unix)]
    pub fn add_binary(&self, id: &str, shell_body: &str) -> PathBuf {
        let path = self.write(id, RunKind::Binary.target_file(), "");
        write_executable(&path, shell_body);
        path
    }

    pub fn scan(&self) -> Catalog {
        let fs = Arc::new(RealFileSystem);
        let assets = FsAssetLoader::new(fs.clone(), self.root().join("assets"));
        Scanner::new(fs.as_ref(), &assets)
            .scan(self.root())
            .expect("Failed to scan temp catalog")
    }
}

impl Default for TempCatalog {
    fn default() -> Self {
        Self::new()
    }
}

/// Write a `#!/bin/sh` script and mark it executable.
#[cfg(unix)]
pub fn write_executable(path: &Path, shell_body: &str) {
    use std::os::unix::fs::PermissionsExt;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create script dir");
    }
    fs::write(path, format!("#!/bin/sh\n{shell_body}\n")).expect("Failed to write script");
    let mut perms = fs::metadata(path).expect("Failed to stat script").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).expect("Failed to chmod script");
}
