// src/supervise/process.rs

//! Production [`Supervisor`]: a real child process per run.

use std::collections::BTreeMap;
use std::env;
use std::ffi::OsString;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::catalog::CatalogEntry;
use crate::errors::KioskError;
use crate::runtime::RuntimeHandle;
use crate::supervise::{classify_stderr, ExitOutcome, Supervisor, SupervisorOptions};
use crate::types::RunKind;

/// Variables set for full-screen devices without a compositor.
const DEVICE_OVERLAY: [(&str, &str); 4] = [
    ("SDL_VIDEODRIVER", "kmsdrm"),
    ("SDL_VIDEO_SYNC", "1"),
    ("SDL_AUDIODRIVER", "alsa"),
    ("SDL_VIDEO_ALLOW_SCREENSAVER", "0"),
];

const ALWAYS_OVERLAY: [(&str, &str); 1] = [("PYGAME_HIDE_SUPPORT_PROMPT", "1")];

/// Interpreter names tried when a script has no environment of its own.
const FALLBACK_INTERPRETERS: [&str; 2] = ["python3", "python"];

#[derive(Debug, Clone)]
pub struct ProcessSupervisor {
    options: SupervisorOptions,
    /// Search path override for interpreter lookup. `None` uses `$PATH`.
    search_path: Option<OsString>,
}

/// What a single run looked like once the child exited.
#[derive(Debug)]
struct SupervisedRun {
    pid: Option<u32>,
    exit_code: Option<i32>,
    stderr: String,
}

impl ProcessSupervisor {
    pub fn new(options: SupervisorOptions) -> Self {
        Self {
            options,
            search_path: None,
        }
    }

    pub fn with_search_path(mut self, search_path: impl Into<OsString>) -> Self {
        self.search_path = Some(search_path.into());
        self
    }

    /// Variables layered over the host environment for every child.
    pub fn child_env(&self) -> BTreeMap<String, String> {
        let mut vars = BTreeMap::new();
        if self.options.device_mode.is_device() {
            for (k, v) in DEVICE_OVERLAY {
                vars.insert(k.to_string(), v.to_string());
            }
        }
        for (k, v) in ALWAYS_OVERLAY {
            vars.insert(k.to_string(), v.to_string());
        }
        for (k, v) in &self.options.env {
            vars.insert(k.clone(), v.clone());
        }
        vars
    }

    /// Program and arguments for `entry`.
    pub fn command_line(
        &self,
        entry: &CatalogEntry,
        environment: Option<&RuntimeHandle>,
    ) -> Result<(PathBuf, Vec<OsString>), KioskError> {
        match entry.run_kind {
            RunKind::Binary => Ok((entry.launch_target.clone(), Vec::new())),
            RunKind::Script => {
                let interpreter = match environment {
                    Some(handle) => handle.path.clone(),
                    None => self.host_interpreter().ok_or_else(|| {
                        KioskError::ChildSpawnFailed(format!(
                            "no interpreter found for {}",
                            entry.id
                        ))
                    })?,
                };
                Ok((interpreter, vec![entry.launch_target.clone().into_os_string()]))
            }
        }
    }

    fn host_interpreter(&self) -> Option<PathBuf> {
        let search_path = self.search_path.clone().or_else(|| env::var_os("PATH"))?;
        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        FALLBACK_INTERPRETERS
            .iter()
            .find_map(|name| which::which_in(name, Some(&search_path), &cwd).ok())
    }

    fn should_raise_window(&self) -> Option<Duration> {
        if self.options.device_mode.is_device() {
            return None;
        }
        let compositing =
            env::var_os("DISPLAY").is_some() || env::var_os("WAYLAND_DISPLAY").is_some();
        if compositing {
            self.options.raise_window_after
        } else {
            None
        }
    }

    async fn spawn_and_wait(
        &self,
        entry: &CatalogEntry,
        program: PathBuf,
        args: Vec<OsString>,
    ) -> Result<SupervisedRun, KioskError> {
        let mut cmd = Command::new(&program);
        cmd.args(&args)
            .current_dir(&entry.dir)
            .envs(self.child_env())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| {
            KioskError::ChildSpawnFailed(format!("{}: {}", program.display(), e))
        })?;
        let pid = child.id();
        info!(entry = %entry.id, program = ?program, pid, "child started");

        let raiser = match (pid, self.should_raise_window()) {
            (Some(pid), Some(delay)) => Some(spawn_window_raise(pid, delay)),
            _ => None,
        };

        let waited = child.wait_with_output().await;
        if let Some(raiser) = raiser {
            raiser.abort();
        }
        let output = waited?;

        Ok(SupervisedRun {
            pid,
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn supervise(
        &self,
        entry: &CatalogEntry,
        environment: Option<RuntimeHandle>,
    ) -> ExitOutcome {
        let (program, args) = match self.command_line(entry, environment.as_ref()) {
            Ok(line) => line,
            Err(err) => {
                warn!(entry = %entry.id, error = %err, "not started");
                return ExitOutcome::NotStarted(err.to_string());
            }
        };

        let run = match self.spawn_and_wait(entry, program, args).await {
            Ok(run) => run,
            Err(err) => {
                warn!(entry = %entry.id, error = %err, "not started");
                return ExitOutcome::NotStarted(err.to_string());
            }
        };

        let outcome = classify_stderr(&entry.display_name, &run.stderr, &self.options.benign);
        match &outcome {
            ExitOutcome::Crashed(msg) => {
                error!(
                    entry = %entry.id,
                    pid = run.pid,
                    exit_code = run.exit_code,
                    reason = %KioskError::ChildCrashed(msg.clone()),
                    "child crashed; full stderr follows:\n{}",
                    run.stderr
                );
            }
            _ => {
                info!(entry = %entry.id, pid = run.pid, exit_code = run.exit_code, "child exited");
                if !run.stderr.trim().is_empty() {
                    debug!(entry = %entry.id, "child stderr:\n{}", run.stderr);
                }
            }
        }
        outcome
    }
}

impl Supervisor for ProcessSupervisor {
    fn run<'a>(
        &'a mut self,
        entry: &'a CatalogEntry,
        environment: Option<RuntimeHandle>,
    ) -> Pin<Box<dyn Future<Output = ExitOutcome> + Send + 'a>> {
        Box::pin(self.supervise(entry, environment))
    }
}

/// Best-effort focus of the child's window after `delay`.
fn spawn_window_raise(pid: u32, delay: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let pid_arg = pid.to_string();
        let status = Command::new("xdotool")
            .args(["search", "--pid", pid_arg.as_str(), "windowactivate"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await;
        match status {
            Ok(status) => debug!(pid, %status, "window raise attempted"),
            Err(err) => debug!(pid, error = %err, "window raise unavailable"),
        }
    })
}
