// src/session/mod.rs

//! Session controller.
//!
//! The pure state machine lives in [`core`]: it consumes [`SessionEvent`]s
//! and answers with [`SessionCommand`]s, without touching processes, the
//! filesystem, or the clock. The async shell in [`runtime`] owns the ports,
//! drives the frame loop, and performs the commands inline.

use crate::catalog::EntryId;
use crate::present::InputEvent;
use crate::provision::ProvisionResult;
use crate::supervise::ExitOutcome;

pub mod boot;
pub mod core;
pub mod runtime;
pub mod view;

pub use boot::BootSequence;
pub use self::core::{Notification, SessionCore};
pub use runtime::{Ports, Session, SoundBank};
pub use view::{EntryView, View};

/// Tunables for the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Frames a crash notification stays visible.
    pub notification_ttl_ticks: u64,
    /// Start in `Browsing` instead of playing the boot sequence.
    pub skip_boot: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            notification_ttl_ticks: 240,
            skip_boot: false,
        }
    }
}

/// Menu offered once an entry is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Run,
    Back,
}

impl MenuChoice {
    fn toggled(self) -> Self {
        match self {
            MenuChoice::Run => MenuChoice::Back,
            MenuChoice::Back => MenuChoice::Run,
        }
    }
}

/// Where the session is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Booting,
    Browsing,
    EntryMenu {
        choice: MenuChoice,
        /// Failure message from the last install attempt.
        notice: Option<String>,
    },
    InstallPrompt {
        /// True while the provisioner is running.
        installing: bool,
    },
    Running {
        entry: EntryId,
    },
    Stopped,
}

/// Navigation depth inside the browsing flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubPhase {
    None,
    Selected,
    ConfirmInstall,
}

impl Phase {
    pub fn sub_phase(&self) -> SubPhase {
        match self {
            Phase::EntryMenu { .. } => SubPhase::Selected,
            Phase::InstallPrompt { .. } => SubPhase::ConfirmInstall,
            _ => SubPhase::None,
        }
    }

    /// Phases during which a blocking operation is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            Phase::Running { .. } | Phase::InstallPrompt { installing: true }
        )
    }
}

/// Inputs to the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Input(InputEvent),
    /// One frame elapsed; carries the current connectivity flag.
    Tick { online: bool },
    ProvisionFinished {
        entry: EntryId,
        result: ProvisionResult,
    },
    RunFinished {
        entry: EntryId,
        outcome: ExitOutcome,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundCue {
    BootChime,
    Notify,
}

/// Work the shell performs on behalf of the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Provision { entry: EntryId },
    Launch { entry: EntryId },
    PlaySound(SoundCue),
    Exit,
}

/// Decision returned by the core after one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreStep {
    pub commands: Vec<SessionCommand>,
    pub keep_running: bool,
}

impl CoreStep {
    fn idle() -> Self {
        Self {
            commands: Vec::new(),
            keep_running: true,
        }
    }

    fn with(commands: Vec<SessionCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}
