use std::str::FromStr;
use serde::Deserialize;

/// How an entry's launch target is executed.
///
/// - `Script`: `main.py`, run through a runtime interpreter.
/// - `Binary`: `main.bin`, executed directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    Script,
    Binary,
}

impl RunKind {
    /// File name of the launch target inside the entry directory.
    pub fn target_file(self) -> &'static str {
        match self {
            RunKind::Script => "main.py",
            RunKind::Binary => "main.bin",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunKind::Script => "script",
            RunKind::Binary => "binary",
        }
    }
}

impl FromStr for RunKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "script" => Ok(RunKind::Script),
            "binary" => Ok(RunKind::Binary),
            other => Err(format!(
                "invalid kind: {other} (expected \"script\" or \"binary\")"
            )),
        }
    }
}

/// Provisioning state of an entry's isolated environment.
///
/// Transitions: `NotInstalled -> Installing -> {Installed, Failed}`, and
/// `Failed -> Installing` on an operator-confirmed retry. `NotRequired` is
/// fixed for entries that run without isolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    NotRequired,
    NotInstalled,
    Installing,
    Installed,
    Failed,
}

impl InstallState {
    /// Whether moving from `self` to `next` is a legal lifecycle step.
    ///
    /// `Installing -> NotInstalled` is allowed only to roll back an attempt
    /// that was refused before touching the disk.
    pub fn can_transition_to(self, next: InstallState) -> bool {
        use InstallState::*;
        matches!(
            (self, next),
            (NotInstalled, Installing)
                | (Failed, Installing)
                | (Installing, Installed)
                | (Installing, Failed)
                | (Installing, NotInstalled)
        )
    }

    /// Whether running the entry needs a provisioning step first.
    pub fn needs_install(self) -> bool {
        matches!(self, InstallState::NotInstalled | InstallState::Failed)
    }
}

/// Whether the child display/audio overlay is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceMode {
    /// Device mode on Linux hosts, desktop mode elsewhere.
    Auto,
    On,
    Off,
}

impl Default for DeviceMode {
    fn default() -> Self {
        DeviceMode::Auto
    }
}

impl DeviceMode {
    pub fn is_device(self) -> bool {
        match self {
            DeviceMode::Auto => cfg!(target_os = "linux"),
            DeviceMode::On => true,
            DeviceMode::Off => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_entries_can_be_retried() {
        assert!(InstallState::Failed.can_transition_to(InstallState::Installing));
        assert!(InstallState::Failed.needs_install());
    }

    #[test]
    fn installed_is_terminal() {
        for next in [
            InstallState::NotInstalled,
            InstallState::Installing,
            InstallState::Failed,
        ] {
            assert!(!InstallState::Installed.can_transition_to(next));
        }
        assert!(!InstallState::NotRequired.can_transition_to(InstallState::Installing));
    }

    #[test]
    fn run_kind_parses_case_insensitively() {
        assert_eq!("Binary".parse::<RunKind>(), Ok(RunKind::Binary));
        assert!("exe".parse::<RunKind>().is_err());
    }
}
