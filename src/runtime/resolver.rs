// src/runtime/resolver.rs

//! Layered interpreter lookup with a per-process cache.
//!
//! Strategies run in a fixed order and the first validated candidate wins:
//! version manager, platform launcher, candidate names on the search path,
//! well-known install locations, then a sweep of every search-path directory.

use std::collections::HashMap;
use std::env;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::errors::{KioskError, Result};
use crate::runtime::probe::{capture_stdout, run_to_completion, CommandProbe, RuntimeProbe};
use crate::runtime::version::{normalize_version, satisfies};

/// A resolved interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeHandle {
    pub path: PathBuf,
    pub reported_version: String,
}

/// Knobs for [`RuntimeResolver`].
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// Upper bound for every validation probe.
    pub probe_timeout: Duration,
    /// Upper bound for a version-manager install.
    pub install_timeout: Duration,
    /// Version manager executable name (e.g. `pyenv`); `None` disables it.
    pub version_manager: Option<String>,
    /// Platform launcher executable name (e.g. `py`); `None` disables it.
    pub launcher: Option<String>,
    /// Absolute install locations to probe. `None` uses the host defaults.
    pub common_locations: Option<Vec<PathBuf>>,
    /// Search path override. `None` uses `$PATH`.
    pub search_path: Option<OsString>,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(5),
            install_timeout: Duration::from_secs(15 * 60),
            version_manager: Some("pyenv".to_string()),
            launcher: Some("py".to_string()),
            common_locations: None,
            search_path: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    VersionManager,
    Launcher,
    SearchPath,
    CommonLocations,
    PathSweep,
}

impl Strategy {
    const ORDER: [Strategy; 5] = [
        Strategy::VersionManager,
        Strategy::Launcher,
        Strategy::SearchPath,
        Strategy::CommonLocations,
        Strategy::PathSweep,
    ];
}

/// Finds interpreters satisfying an optional `major.minor` constraint.
pub struct RuntimeResolver {
    options: ResolverOptions,
    probe: Arc<dyn RuntimeProbe>,
    cache: HashMap<String, RuntimeHandle>,
}

impl fmt::Debug for RuntimeResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeResolver")
            .field("options", &self.options)
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl RuntimeResolver {
    pub fn new(options: ResolverOptions) -> Self {
        let probe = Arc::new(CommandProbe::new(options.probe_timeout));
        Self::with_probe(options, probe)
    }

    pub fn with_probe(options: ResolverOptions, probe: Arc<dyn RuntimeProbe>) -> Self {
        Self {
            options,
            probe,
            cache: HashMap::new(),
        }
    }

    /// Resolve a runtime for `constraint`.
    ///
    /// `allow_install` lets the version manager fetch a missing version; the
    /// caller passes the current connectivity state.
    pub async fn resolve(
        &mut self,
        constraint: Option<&str>,
        allow_install: bool,
    ) -> Result<RuntimeHandle> {
        let wanted = match constraint {
            Some(raw) => Some(normalize_version(raw).map_err(KioskError::RuntimeNotFound)?),
            None => None,
        };
        let key = wanted.clone().unwrap_or_default();

        if let Some(hit) = self.cache.get(&key) {
            debug!(constraint = %key, path = ?hit.path, "runtime cache hit");
            return Ok(hit.clone());
        }

        for strategy in Strategy::ORDER {
            match self.try_strategy(strategy, wanted.as_deref(), allow_install).await {
                Some(handle) => {
                    info!(
                        ?strategy,
                        constraint = %key,
                        path = ?handle.path,
                        version = %handle.reported_version,
                        "resolved runtime"
                    );
                    self.cache.insert(key, handle.clone());
                    return Ok(handle);
                }
                None => debug!(?strategy, constraint = %key, "no runtime from strategy"),
            }
        }

        let what = wanted.unwrap_or_else(|| "any version".to_string());
        warn!(constraint = %what, "unable to resolve a runtime");
        Err(KioskError::RuntimeNotFound(what))
    }

    async fn try_strategy(
        &self,
        strategy: Strategy,
        wanted: Option<&str>,
        allow_install: bool,
    ) -> Option<RuntimeHandle> {
        match strategy {
            Strategy::VersionManager => self.from_version_manager(wanted, allow_install).await,
            Strategy::Launcher => self.from_launcher(wanted).await,
            Strategy::SearchPath => self.from_search_path(wanted).await,
            Strategy::CommonLocations => self.from_common_locations(wanted).await,
            Strategy::PathSweep => self.from_path_sweep(wanted).await,
        }
    }

    /// Accept `exe` if it runs and reports a satisfying version.
    async fn validate(&self, exe: &Path, wanted: Option<&str>) -> Option<RuntimeHandle> {
        let reported = self.probe.report_version(exe).await?;
        if satisfies(&reported, wanted) {
            Some(RuntimeHandle {
                path: exe.to_path_buf(),
                reported_version: reported,
            })
        } else {
            debug!(exe = ?exe, %reported, ?wanted, "candidate version mismatch");
            None
        }
    }

    fn search_path(&self) -> Option<OsString> {
        self.options
            .search_path
            .clone()
            .or_else(|| env::var_os("PATH"))
    }

    fn which(&self, name: &str) -> Option<PathBuf> {
        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        which::which_in(name, self.search_path(), cwd).ok()
    }

    async fn from_version_manager(
        &self,
        wanted: Option<&str>,
        allow_install: bool,
    ) -> Option<RuntimeHandle> {
        let manager = self.which(self.options.version_manager.as_deref()?)?;
        let timeout = self.options.probe_timeout;

        let Some(version) = wanted else {
            let exe = capture_stdout(&manager, ["which", "python3"], timeout).await?;
            return self.validate(Path::new(&exe), None).await;
        };

        if let Some(handle) = self.manager_prefix(&manager, version).await {
            return Some(handle);
        }
        if !allow_install {
            debug!(%version, "version manager lacks version and installs are not allowed");
            return None;
        }

        info!(%version, manager = ?manager, "installing runtime through version manager");
        let install = ["install", "-s", version];
        if let Err(reason) =
            run_to_completion(&manager, install, self.options.install_timeout).await
        {
            warn!(%version, manager = ?manager, %reason, "version manager install failed");
            return None;
        }
        self.manager_prefix(&manager, version).await
    }

    async fn manager_prefix(&self, manager: &Path, version: &str) -> Option<RuntimeHandle> {
        let prefix = capture_stdout(manager, ["prefix", version], self.options.probe_timeout).await?;
        let exe = interpreter_in_prefix(Path::new(prefix.lines().next()?));
        self.validate(&exe, Some(version)).await
    }

    async fn from_launcher(&self, wanted: Option<&str>) -> Option<RuntimeHandle> {
        let launcher = self.which(self.options.launcher.as_deref()?)?;
        let selector = match wanted {
            Some(version) => format!("-{version}"),
            None => "-3".to_string(),
        };
        let exe = capture_stdout(
            &launcher,
            [selector.as_str(), "-c", "import sys;print(sys.executable)"],
            self.options.probe_timeout,
        )
        .await?;
        self.validate(Path::new(&exe), wanted).await
    }

    async fn from_search_path(&self, wanted: Option<&str>) -> Option<RuntimeHandle> {
        for name in candidate_names(wanted) {
            if let Some(exe) = self.which(&name) {
                if let Some(handle) = self.validate(&exe, wanted).await {
                    return Some(handle);
                }
            }
        }
        None
    }

    async fn from_common_locations(&self, wanted: Option<&str>) -> Option<RuntimeHandle> {
        let locations = match &self.options.common_locations {
            Some(list) => list.clone(),
            None => default_locations(wanted),
        };
        for exe in locations {
            if let Some(handle) = self.validate(&exe, wanted).await {
                return Some(handle);
            }
        }
        None
    }

    async fn from_path_sweep(&self, wanted: Option<&str>) -> Option<RuntimeHandle> {
        let search_path = self.search_path()?;
        for dir in env::split_paths(&search_path) {
            if dir.as_os_str().is_empty() {
                continue;
            }
            for name in sweep_names() {
                let exe = dir.join(name);
                if let Some(handle) = self.validate(&exe, wanted).await {
                    return Some(handle);
                }
            }
        }
        None
    }
}

/// Executable names tried on the search path, most specific first.
fn candidate_names(wanted: Option<&str>) -> Vec<String> {
    let mut names = Vec::new();
    if let Some(version) = wanted {
        names.push(format!("python{version}"));
    }
    names.push("python3".to_string());
    names.push("python".to_string());
    names
}

fn sweep_names() -> &'static [&'static str] {
    if cfg!(windows) {
        &["python.exe", "python"]
    } else {
        &["python3", "python"]
    }
}

fn interpreter_in_prefix(prefix: &Path) -> PathBuf {
    if cfg!(windows) {
        prefix.join("python.exe")
    } else {
        prefix.join("bin").join("python")
    }
}

fn default_locations(wanted: Option<&str>) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if cfg!(windows) {
        if let Some(version) = wanted {
            let short = version.replace('.', "");
            paths.push(PathBuf::from(format!(r"C:\Python{short}\python.exe")));
            paths.push(PathBuf::from(format!(r"C:\Program Files\Python{short}\python.exe")));
            paths.push(PathBuf::from(format!(
                r"C:\Program Files (x86)\Python{short}\python.exe"
            )));
        }
        paths.push(PathBuf::from(r"C:\Python39\python.exe"));
        paths.push(PathBuf::from(r"C:\Program Files\Python39\python.exe"));
    } else {
        if let Some(version) = wanted {
            paths.push(PathBuf::from(format!("/usr/bin/python{version}")));
            paths.push(PathBuf::from(format!("/usr/local/bin/python{version}")));
        }
        paths.push(PathBuf::from("/usr/bin/python3"));
        paths.push(PathBuf::from("/usr/bin/python"));
    }
    paths
}
