// src/runtime/probe.rs

//! Candidate validation: run an interpreter and ask it for its version.

use std::ffi::OsStr;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

/// Snippet passed via `-c`; prints `major.minor`.
pub const VERSION_SNIPPET: &str =
    "import sys;print(f'{sys.version_info.major}.{sys.version_info.minor}')";

/// Asks a candidate executable for its self-reported version.
///
/// Any failure (missing binary, non-zero exit, timeout, garbage output) is
/// reported as `None`; the resolver then moves on to the next candidate.
pub trait RuntimeProbe: Send + Sync {
    fn report_version<'a>(
        &'a self,
        exe: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>>;
}

/// Production probe that invokes the candidate as a child process.
#[derive(Debug, Clone)]
pub struct CommandProbe {
    timeout: Duration,
}

impl CommandProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl RuntimeProbe for CommandProbe {
    fn report_version<'a>(
        &'a self,
        exe: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        Box::pin(async move {
            if !exe.is_file() {
                return None;
            }
            let out = capture_stdout(exe, ["-c", VERSION_SNIPPET], self.timeout).await?;
            let reported = out.trim().to_string();
            if looks_like_version(&reported) {
                Some(reported)
            } else {
                debug!(exe = ?exe, output = %reported, "unparsable version output");
                None
            }
        })
    }
}

fn looks_like_version(s: &str) -> bool {
    let mut parts = s.split('.');
    let (Some(major), Some(minor), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    !major.is_empty()
        && !minor.is_empty()
        && major.chars().all(|c| c.is_ascii_digit())
        && minor.chars().all(|c| c.is_ascii_digit())
}

/// Run `program args...` and return its trimmed stdout if it exits
/// successfully within `timeout` with something to say.
pub async fn capture_stdout<I, S>(
    program: impl AsRef<OsStr>,
    args: I,
    timeout: Duration,
) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let program = program.as_ref();
    match run_to_completion(program, args, timeout).await {
        Ok(stdout) if stdout.is_empty() => None,
        Ok(stdout) => Some(stdout),
        Err(reason) => {
            debug!(program = ?program, %reason, "probe failed");
            None
        }
    }
}

/// Run `program args...` to completion and return its trimmed stdout.
///
/// `Err` describes why the run did not succeed: spawn failure, timeout
/// (the child is killed), or a non-zero exit.
pub async fn run_to_completion<I, S>(
    program: impl AsRef<OsStr>,
    args: I,
    timeout: Duration,
) -> std::result::Result<String, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(program.as_ref());
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    let output = match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(err)) => return Err(format!("failed to run: {err}")),
        Err(_) => return Err(format!("timed out after {timeout:?}")),
    };
    if !output.status.success() {
        return Err(format!("exited with {}", output.status));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_shape() {
        assert!(looks_like_version("3.11"));
        assert!(!looks_like_version("3.11.2"));
        assert!(!looks_like_version("Python 3.11"));
        assert!(!looks_like_version("3."));
    }

    #[tokio::test]
    async fn missing_binary_reports_nothing() {
        let probe = CommandProbe::new(Duration::from_secs(1));
        let reported = probe
            .report_version(Path::new("/definitely/not/here/python3"))
            .await;
        assert_eq!(reported, None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn run_reports_why_it_failed() {
        let quiet = run_to_completion("sh", ["-c", "true"], Duration::from_secs(5)).await;
        assert_eq!(quiet, Ok(String::new()));

        let failed = run_to_completion("sh", ["-c", "exit 4"], Duration::from_secs(5)).await;
        let reason = failed.unwrap_err();
        assert!(reason.contains("exit"), "reason: {reason}");

        let slow = run_to_completion("sh", ["-c", "sleep 5"], Duration::from_millis(50)).await;
        assert!(slow.unwrap_err().starts_with("timed out"));
    }
}
