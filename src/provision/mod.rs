// src/provision/mod.rs

//! Building an entry's isolated environment.
//!
//! The session shell awaits [`Provisioner::provision`] inline and only ever
//! sees a [`ProvisionResult`]; nothing in here returns an error upward.

use std::ffi::OsStr;
use std::fmt;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{anyhow, Context};
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::catalog::CatalogEntry;
use crate::errors::KioskError;
use crate::runtime::{RuntimeHandle, RuntimeResolver};

pub mod layout;

/// Lines of installer output kept for display.
pub const DEFAULT_TAIL_LINES: usize = 20;

/// Why an attempt did not produce an environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionFailure {
    ManifestMissing,
    NetworkUnavailable,
    RuntimeNotFound,
    EnvironmentCreation,
    InstallFailed,
}

impl ProvisionFailure {
    /// Refusals happen before anything on disk is touched.
    pub fn is_refusal(self) -> bool {
        matches!(
            self,
            ProvisionFailure::ManifestMissing | ProvisionFailure::NetworkUnavailable
        )
    }
}

/// Outcome of one provisioning attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionResult {
    pub success: bool,
    /// Operator-facing, single line.
    pub message: String,
    /// Last lines of installer output, when there was any.
    pub stderr_tail: Option<String>,
    pub failure: Option<ProvisionFailure>,
}

impl ProvisionResult {
    pub fn installed(name: &str) -> Self {
        Self {
            success: true,
            message: format!("{name} installed"),
            stderr_tail: None,
            failure: None,
        }
    }

    pub fn failed(failure: ProvisionFailure, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            stderr_tail: None,
            failure: Some(failure),
        }
    }

    pub fn with_tail(mut self, tail: Option<String>) -> Self {
        self.stderr_tail = tail;
        self
    }
}

impl fmt::Display for ProvisionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Port the session uses to install an entry's dependencies.
pub trait Provisioner: Send {
    fn provision<'a>(
        &'a mut self,
        entry: &'a CatalogEntry,
        online: bool,
    ) -> Pin<Box<dyn Future<Output = ProvisionResult> + Send + 'a>>;
}

/// Combined output of a finished helper process.
#[derive(Debug)]
struct Captured {
    exit_code: Option<i32>,
    success: bool,
    output: String,
}

/// Production provisioner: `<runtime> -m venv` then `pip install -r`.
#[derive(Debug)]
pub struct EnvProvisioner {
    resolver: RuntimeResolver,
    step_timeout: Duration,
    tail_lines: usize,
}

impl EnvProvisioner {
    pub fn new(resolver: RuntimeResolver, step_timeout: Duration) -> Self {
        Self {
            resolver,
            step_timeout,
            tail_lines: DEFAULT_TAIL_LINES,
        }
    }

    async fn provision_entry(&mut self, entry: &CatalogEntry, online: bool) -> ProvisionResult {
        let Some(manifest) = entry.manifest.as_deref().filter(|m| m.is_file()) else {
            info!(entry = %entry.id, "refusing install: no dependency manifest");
            return ProvisionResult::failed(
                ProvisionFailure::ManifestMissing,
                format!("{}: no dependency manifest to install", entry.display_name),
            );
        };
        if !online {
            info!(entry = %entry.id, reason = %KioskError::NetworkUnavailable, "refusing install");
            return ProvisionResult::failed(
                ProvisionFailure::NetworkUnavailable,
                "No network connection: connect to the internet to install",
            );
        }

        let runtime = match self.resolve_runtime(entry, online).await {
            Some(runtime) => runtime,
            None => {
                let wanted = entry
                    .requested_runtime_version
                    .clone()
                    .unwrap_or_else(|| "any version".to_string());
                error!(
                    entry = %entry.id,
                    reason = %KioskError::RuntimeNotFound(wanted.clone()),
                    "install aborted"
                );
                return ProvisionResult::failed(
                    ProvisionFailure::RuntimeNotFound,
                    format!("No Python runtime found ({wanted})"),
                );
            }
        };

        let env = layout::env_dir(&entry.dir);
        if env.exists() {
            info!(entry = %entry.id, env = ?env, "removing stale environment");
            remove_env(&env).await;
        }

        let result = self.build_env(entry, &runtime, manifest, &env).await;
        if !result.success {
            remove_env(&env).await;
        }
        result
    }

    async fn resolve_runtime(&mut self, entry: &CatalogEntry, online: bool) -> Option<RuntimeHandle> {
        if let Some(wanted) = entry.requested_runtime_version.as_deref() {
            match self.resolver.resolve(Some(wanted), online).await {
                Ok(handle) => return Some(handle),
                Err(err) => {
                    warn!(entry = %entry.id, error = %err, "falling back to any runtime")
                }
            }
        }
        self.resolver.resolve(None, online).await.ok()
    }

    async fn build_env(
        &self,
        entry: &CatalogEntry,
        runtime: &RuntimeHandle,
        manifest: &Path,
        env: &Path,
    ) -> ProvisionResult {
        info!(
            entry = %entry.id,
            runtime = ?runtime.path,
            version = %runtime.reported_version,
            "creating environment"
        );
        let created = run_captured(
            &runtime.path,
            [OsStr::new("-m"), OsStr::new("venv"), env.as_os_str()],
            &entry.dir,
            self.step_timeout,
        )
        .await;
        let interpreter = layout::env_interpreter(env);
        match created {
            Ok(out) if out.success && interpreter.is_file() => {}
            Ok(out) => {
                error!(entry = %entry.id, exit_code = out.exit_code, "environment creation failed");
                return ProvisionResult::failed(
                    ProvisionFailure::EnvironmentCreation,
                    format!("Could not create an environment for {}", entry.display_name),
                )
                .with_tail(self.tail(&out.output));
            }
            Err(err) => {
                error!(entry = %entry.id, error = %err, "environment creation failed");
                return ProvisionResult::failed(
                    ProvisionFailure::EnvironmentCreation,
                    format!("Could not create an environment for {}", entry.display_name),
                );
            }
        }

        info!(entry = %entry.id, manifest = ?manifest, "installing dependencies");
        let installed = run_captured(
            &interpreter,
            [
                OsStr::new("-m"),
                OsStr::new("pip"),
                OsStr::new("install"),
                OsStr::new("-r"),
                manifest.as_os_str(),
            ],
            &entry.dir,
            self.step_timeout,
        )
        .await;

        match installed {
            Ok(out) if out.success => {
                debug!(entry = %entry.id, "installer output:\n{}", out.output);
            }
            Ok(out) => {
                let code = out
                    .exit_code
                    .map_or_else(|| "signal".to_string(), |c| c.to_string());
                error!(
                    entry = %entry.id,
                    exit_code = out.exit_code,
                    reason = %KioskError::InstallFailed(format!("installer exited with {code}")),
                    "installer output:\n{}",
                    out.output
                );
                return ProvisionResult::failed(
                    ProvisionFailure::InstallFailed,
                    format!("Installing {} failed (exit {code})", entry.display_name),
                )
                .with_tail(self.tail(&out.output));
            }
            Err(err) => {
                error!(entry = %entry.id, error = %err, "installer did not complete");
                return ProvisionResult::failed(
                    ProvisionFailure::InstallFailed,
                    format!("Installing {} failed: {err}", entry.display_name),
                );
            }
        }

        if let Err(err) = record_manifest(manifest, env).await {
            warn!(entry = %entry.id, error = %err, "could not record manifest digest");
        }
        info!(entry = %entry.id, "environment ready");
        ProvisionResult::installed(&entry.display_name)
    }

    fn tail(&self, output: &str) -> Option<String> {
        tail_lines(output, self.tail_lines)
    }
}

impl Provisioner for EnvProvisioner {
    fn provision<'a>(
        &'a mut self,
        entry: &'a CatalogEntry,
        online: bool,
    ) -> Pin<Box<dyn Future<Output = ProvisionResult> + Send + 'a>> {
        Box::pin(self.provision_entry(entry, online))
    }
}

/// Last `n` non-blank lines of `output`, or `None` if there are none.
pub fn tail_lines(output: &str, n: usize) -> Option<String> {
    let lines: Vec<&str> = output.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.is_empty() || n == 0 {
        return None;
    }
    let start = lines.len().saturating_sub(n);
    Some(lines[start..].join("\n"))
}

async fn run_captured<I, S>(
    program: &Path,
    args: I,
    cwd: &Path,
    timeout: Duration,
) -> anyhow::Result<Captured>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(program);
    cmd.args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = tokio::time::timeout(timeout, cmd.output())
        .await
        .map_err(|_| anyhow!("{} timed out after {:?}", program.display(), timeout))?
        .with_context(|| format!("running {}", program.display()))?;

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    Ok(Captured {
        exit_code: output.status.code(),
        success: output.status.success(),
        output: combined,
    })
}

async fn record_manifest(manifest: &Path, env: &Path) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(manifest)
        .await
        .with_context(|| format!("reading {}", manifest.display()))?;
    let marker = layout::marker_path(env);
    tokio::fs::write(&marker, layout::manifest_digest(&bytes))
        .await
        .with_context(|| format!("writing {}", marker.display()))
}

/// Best-effort; a leftover directory is only logged.
async fn remove_env(env: &Path) {
    match tokio::fs::remove_dir_all(env).await {
        Ok(()) => debug!(env = ?env, "environment removed"),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => warn!(env = ?env, error = %err, "could not remove environment"),
    }
}
