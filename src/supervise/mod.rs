// src/supervise/mod.rs

//! Running one entry as a child process and classifying how it ended.
//!
//! The session shell talks to a [`Supervisor`] rather than spawning
//! processes itself, so tests can swap in a fake that never touches the OS.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::catalog::CatalogEntry;
use crate::runtime::RuntimeHandle;
use crate::types::DeviceMode;

pub mod classify;
pub mod process;

pub use classify::{classify_stderr, BenignStderr};
pub use process::ProcessSupervisor;

/// How a supervised run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    Clean,
    /// User-facing message, `"<name> crashed: <last stderr line>"`.
    Crashed(String),
    /// The child could not be started at all.
    NotStarted(String),
}

impl ExitOutcome {
    pub fn crash_message(&self) -> Option<&str> {
        match self {
            ExitOutcome::Crashed(msg) => Some(msg),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SupervisorOptions {
    pub benign: BenignStderr,
    /// Delay before raising the child's window; `None` never raises.
    pub raise_window_after: Option<Duration>,
    pub device_mode: DeviceMode,
    /// Applied to every child after the display/audio overlay.
    pub env: BTreeMap<String, String>,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            benign: BenignStderr::default(),
            raise_window_after: Some(Duration::from_secs(1)),
            device_mode: DeviceMode::default(),
            env: BTreeMap::new(),
        }
    }
}

/// Runs an entry to completion.
///
/// Implementations never retry and never return an error: every failure is
/// folded into the [`ExitOutcome`].
pub trait Supervisor: Send {
    fn run<'a>(
        &'a mut self,
        entry: &'a CatalogEntry,
        environment: Option<RuntimeHandle>,
    ) -> Pin<Box<dyn Future<Output = ExitOutcome> + Send + 'a>>;
}
