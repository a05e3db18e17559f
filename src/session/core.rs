// src/session/core.rs

//! Pure session state machine.
//!
//! [`SessionCore::step`] takes one [`SessionEvent`] and returns the commands
//! the shell must perform. Nothing here awaits, spawns, or reads the clock,
//! so the whole navigation flow can be tested with plain values.

use std::collections::VecDeque;

use tracing::{debug, info, warn};

use crate::catalog::{Catalog, CatalogEntry};
use crate::present::InputEvent;
use crate::provision::ProvisionResult;
use crate::session::boot::BootSequence;
use crate::session::view::View;
use crate::session::{
    CoreStep, MenuChoice, Phase, SessionCommand, SessionEvent, SessionOptions, SoundCue,
};
use crate::supervise::ExitOutcome;
use crate::types::InstallState;

/// A transient message that disappears on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    /// Tick after which the notification is dropped.
    pub expires_at: u64,
}

#[derive(Debug)]
pub struct SessionCore {
    catalog: Catalog,
    phase: Phase,
    /// Index into the catalog; also the display index.
    selected: usize,
    boot: BootSequence,
    notifications: VecDeque<Notification>,
    online: bool,
    options: SessionOptions,
    tick: u64,
    /// State to restore if the current install attempt is refused.
    pending_prior: Option<InstallState>,
}

impl SessionCore {
    pub fn new(catalog: Catalog, options: SessionOptions, online: bool) -> Self {
        let (phase, boot) = if options.skip_boot {
            (Phase::Browsing, BootSequence::finished())
        } else {
            (Phase::Booting, BootSequence::new())
        };
        Self {
            catalog,
            phase,
            selected: 0,
            boot,
            notifications: VecDeque::new(),
            online,
            options,
            tick: 0,
            pending_prior: None,
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_entry(&self) -> Option<&CatalogEntry> {
        self.catalog.at(self.selected)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn notifications(&self) -> impl Iterator<Item = &Notification> {
        self.notifications.iter()
    }

    pub fn view(&self) -> View {
        View {
            phase: self.phase.clone(),
            boot_alpha: self.boot.alpha(),
            entries: View::entries_of(&self.catalog),
            selected: self.selected,
            online: self.online,
            notifications: self.notifications.iter().map(|n| n.message.clone()).collect(),
        }
    }

    /// Handle a single event, updating state and returning the commands for
    /// the shell.
    pub fn step(&mut self, event: SessionEvent) -> CoreStep {
        match event {
            SessionEvent::Tick { online } => self.on_tick(online),
            SessionEvent::Input(input) => self.on_input(input),
            SessionEvent::ProvisionFinished { entry, result } => {
                self.on_provision_finished(&entry, result)
            }
            SessionEvent::RunFinished { entry, outcome } => self.on_run_finished(&entry, outcome),
        }
    }

    fn on_tick(&mut self, online: bool) -> CoreStep {
        self.tick += 1;
        if self.online != online {
            debug!(online, "connectivity flag changed");
        }
        self.online = online;

        let now = self.tick;
        self.notifications.retain(|n| n.expires_at > now);

        let mut commands = Vec::new();
        if self.phase == Phase::Booting {
            let boot = self.boot.advance();
            if boot.play_chime {
                commands.push(SessionCommand::PlaySound(SoundCue::BootChime));
            }
            if boot.finished {
                info!(entries = self.catalog.len(), "boot finished; browsing");
                self.phase = Phase::Browsing;
            }
        }
        CoreStep::with(commands)
    }

    fn on_input(&mut self, input: InputEvent) -> CoreStep {
        if self.phase.is_busy() || self.phase == Phase::Stopped {
            debug!(?input, phase = ?self.phase, "input ignored");
            return CoreStep::idle();
        }
        if input == InputEvent::Quit {
            info!("quit requested");
            self.phase = Phase::Stopped;
            return CoreStep {
                commands: vec![SessionCommand::Exit],
                keep_running: false,
            };
        }

        match self.phase.clone() {
            Phase::Booting => CoreStep::idle(),
            Phase::Browsing => self.browse(input),
            Phase::EntryMenu { choice, .. } => self.entry_menu(input, choice),
            Phase::InstallPrompt { .. } => self.install_prompt(input),
            Phase::Running { .. } | Phase::Stopped => CoreStep::idle(),
        }
    }

    fn browse(&mut self, input: InputEvent) -> CoreStep {
        let len = self.catalog.len();
        match input {
            InputEvent::Up | InputEvent::Left => {
                self.selected = (self.selected + len - 1) % len;
            }
            InputEvent::Down | InputEvent::Right => {
                self.selected = (self.selected + 1) % len;
            }
            InputEvent::Confirm => {
                self.phase = Phase::EntryMenu {
                    choice: MenuChoice::Run,
                    notice: None,
                };
            }
            InputEvent::Cancel | InputEvent::Quit => {}
        }
        CoreStep::idle()
    }

    fn entry_menu(&mut self, input: InputEvent, choice: MenuChoice) -> CoreStep {
        match input {
            InputEvent::Up | InputEvent::Down | InputEvent::Left | InputEvent::Right => {
                if let Phase::EntryMenu { choice, .. } = &mut self.phase {
                    *choice = choice.toggled();
                }
                CoreStep::idle()
            }
            InputEvent::Cancel => {
                self.phase = Phase::Browsing;
                CoreStep::idle()
            }
            InputEvent::Confirm => match choice {
                MenuChoice::Back => {
                    self.phase = Phase::Browsing;
                    CoreStep::idle()
                }
                MenuChoice::Run => self.request_run(),
            },
            InputEvent::Quit => CoreStep::idle(),
        }
    }

    fn install_prompt(&mut self, input: InputEvent) -> CoreStep {
        // An install in flight owns the prompt until its result arrives.
        if self.phase == (Phase::InstallPrompt { installing: true }) {
            return CoreStep::idle();
        }
        match input {
            InputEvent::Confirm => self.start_install(),
            InputEvent::Cancel => {
                self.phase = Phase::Browsing;
                CoreStep::idle()
            }
            _ => CoreStep::idle(),
        }
    }

    fn request_run(&mut self) -> CoreStep {
        let Some(entry) = self.catalog.at(self.selected) else {
            return CoreStep::idle();
        };
        if entry.needs_install() {
            debug!(entry = %entry.id, state = ?entry.install_state, "install required first");
            self.phase = Phase::InstallPrompt { installing: false };
            return CoreStep::idle();
        }
        let id = entry.id.clone();
        self.launch(id)
    }

    fn launch(&mut self, id: String) -> CoreStep {
        info!(entry = %id, "launching");
        self.phase = Phase::Running { entry: id.clone() };
        CoreStep::with(vec![SessionCommand::Launch { entry: id }])
    }

    fn start_install(&mut self) -> CoreStep {
        let Some(entry) = self.catalog.at(self.selected) else {
            return CoreStep::idle();
        };
        let id = entry.id.clone();
        let prior = entry.install_state;
        if !self.catalog.set_install_state(&id, InstallState::Installing) {
            return CoreStep::idle();
        }
        info!(entry = %id, "installing");
        self.pending_prior = Some(prior);
        self.phase = Phase::InstallPrompt { installing: true };
        CoreStep::with(vec![SessionCommand::Provision { entry: id }])
    }

    fn on_provision_finished(&mut self, id: &str, result: ProvisionResult) -> CoreStep {
        if self.phase != (Phase::InstallPrompt { installing: true }) {
            warn!(entry = %id, phase = ?self.phase, "unexpected provisioning result");
            return CoreStep::idle();
        }
        let prior = self.pending_prior.take();

        if result.success {
            self.catalog.set_install_state(id, InstallState::Installed);
            return self.launch(id.to_string());
        }

        let next = match (result.failure, prior) {
            (Some(failure), Some(prior)) if failure.is_refusal() => prior,
            _ => InstallState::Failed,
        };
        self.catalog.set_install_state(id, next);
        warn!(entry = %id, state = ?next, message = %result.message, "install did not complete");
        self.phase = Phase::EntryMenu {
            choice: MenuChoice::Run,
            notice: Some(result.message),
        };
        CoreStep::idle()
    }

    fn on_run_finished(&mut self, id: &str, outcome: ExitOutcome) -> CoreStep {
        if !matches!(&self.phase, Phase::Running { entry } if entry == id) {
            warn!(entry = %id, phase = ?self.phase, "unexpected run result");
        }
        self.phase = Phase::Browsing;

        match outcome {
            ExitOutcome::Clean => {
                info!(entry = %id, "entry exited");
                CoreStep::idle()
            }
            ExitOutcome::NotStarted(reason) => {
                info!(entry = %id, %reason, "entry did not start");
                CoreStep::idle()
            }
            ExitOutcome::Crashed(message) => {
                self.notifications.push_back(Notification {
                    message,
                    expires_at: self.tick + self.options.notification_ttl_ticks,
                });
                CoreStep::with(vec![SessionCommand::PlaySound(SoundCue::Notify)])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Thumbnail;
    use crate::provision::ProvisionFailure;
    use crate::session::SubPhase;
    use crate::types::RunKind;
    use proptest::prelude::*;
    use std::path::PathBuf;

    fn entry(id: &str, isolated: bool) -> CatalogEntry {
        CatalogEntry {
            id: id.to_string(),
            display_name: id.to_uppercase(),
            dir: PathBuf::from("/games").join(id),
            launch_target: PathBuf::from("/games").join(id).join("main.py"),
            thumbnail: Thumbnail::None,
            run_kind: RunKind::Script,
            requires_isolated_env: isolated,
            requested_runtime_version: None,
            manifest: isolated.then(|| PathBuf::from("/games").join(id).join("requirements.txt")),
            install_state: if isolated {
                InstallState::NotInstalled
            } else {
                InstallState::NotRequired
            },
        }
    }

    fn browsing(entries: Vec<CatalogEntry>) -> SessionCore {
        let options = SessionOptions {
            notification_ttl_ticks: 3,
            skip_boot: true,
        };
        SessionCore::new(Catalog::new(entries).unwrap(), options, true)
    }

    fn press(core: &mut SessionCore, inputs: &[InputEvent]) -> Vec<SessionCommand> {
        inputs
            .iter()
            .flat_map(|i| core.step(SessionEvent::Input(*i)).commands)
            .collect()
    }

    #[test]
    fn boot_runs_until_browsing_and_chimes() {
        let mut core = SessionCore::new(
            Catalog::new(vec![entry("a", false)]).unwrap(),
            SessionOptions::default(),
            false,
        );
        assert_eq!(core.phase(), &Phase::Booting);
        assert!(core.step(SessionEvent::Input(InputEvent::Confirm)).commands.is_empty());

        let mut chimes = 0;
        for _ in 0..400 {
            let step = core.step(SessionEvent::Tick { online: false });
            chimes += step
                .commands
                .iter()
                .filter(|c| **c == SessionCommand::PlaySound(SoundCue::BootChime))
                .count();
        }
        assert_eq!(core.phase(), &Phase::Browsing);
        assert_eq!(chimes, 1);
    }

    #[test]
    fn navigation_wraps() {
        let mut core = browsing(vec![entry("a", false), entry("b", false), entry("c", false)]);
        press(&mut core, &[InputEvent::Up]);
        assert_eq!(core.selected(), 2);
        press(&mut core, &[InputEvent::Right, InputEvent::Right]);
        assert_eq!(core.selected(), 1);
        assert_eq!(core.selected_entry().unwrap().id, "b");
    }

    #[test]
    fn menu_back_returns_to_browsing() {
        let mut core = browsing(vec![entry("a", false)]);
        press(&mut core, &[InputEvent::Confirm]);
        assert_eq!(core.phase().sub_phase(), SubPhase::Selected);
        press(&mut core, &[InputEvent::Right, InputEvent::Confirm]);
        assert_eq!(core.phase(), &Phase::Browsing);
        press(&mut core, &[InputEvent::Confirm, InputEvent::Cancel]);
        assert_eq!(core.phase(), &Phase::Browsing);
    }

    #[test]
    fn plain_entries_launch_without_provisioning() {
        let mut core = browsing(vec![entry("a", false)]);
        let commands = press(&mut core, &[InputEvent::Confirm, InputEvent::Confirm]);
        assert_eq!(
            commands,
            vec![SessionCommand::Launch {
                entry: "a".to_string()
            }]
        );
        assert!(core.phase().is_busy());
    }

    #[test]
    fn input_is_ignored_while_running() {
        let mut core = browsing(vec![entry("a", false)]);
        press(&mut core, &[InputEvent::Confirm, InputEvent::Confirm]);
        let step = core.step(SessionEvent::Input(InputEvent::Quit));
        assert!(step.keep_running);
        assert_eq!(
            core.phase(),
            &Phase::Running {
                entry: "a".to_string()
            }
        );
    }

    #[test]
    fn isolated_entry_routes_through_install_prompt() {
        let mut core = browsing(vec![entry("demo", true)]);
        let commands = press(&mut core, &[InputEvent::Confirm, InputEvent::Confirm]);
        assert!(commands.is_empty());
        assert_eq!(core.phase().sub_phase(), SubPhase::ConfirmInstall);

        press(&mut core, &[InputEvent::Cancel]);
        assert_eq!(core.phase(), &Phase::Browsing);
        assert_eq!(
            core.catalog().get("demo").unwrap().install_state,
            InstallState::NotInstalled
        );

        let commands = press(
            &mut core,
            &[InputEvent::Confirm, InputEvent::Confirm, InputEvent::Confirm],
        );
        assert_eq!(
            commands,
            vec![SessionCommand::Provision {
                entry: "demo".to_string()
            }]
        );
        assert_eq!(
            core.catalog().get("demo").unwrap().install_state,
            InstallState::Installing
        );
    }

    #[test]
    fn cancel_is_ignored_while_installing() {
        let mut core = browsing(vec![entry("demo", true)]);
        press(&mut core, &[InputEvent::Confirm, InputEvent::Confirm, InputEvent::Confirm]);
        press(&mut core, &[InputEvent::Cancel]);
        assert_eq!(core.phase(), &Phase::InstallPrompt { installing: true });
    }

    #[test]
    fn successful_install_launches() {
        let mut core = browsing(vec![entry("demo", true)]);
        press(&mut core, &[InputEvent::Confirm, InputEvent::Confirm, InputEvent::Confirm]);

        let step = core.step(SessionEvent::ProvisionFinished {
            entry: "demo".to_string(),
            result: ProvisionResult::installed("DEMO"),
        });
        assert_eq!(
            step.commands,
            vec![SessionCommand::Launch {
                entry: "demo".to_string()
            }]
        );
        assert_eq!(
            core.catalog().get("demo").unwrap().install_state,
            InstallState::Installed
        );
    }

    #[test]
    fn refused_install_restores_state_and_shows_notice() {
        let mut core = browsing(vec![entry("demo", true)]);
        press(&mut core, &[InputEvent::Confirm, InputEvent::Confirm, InputEvent::Confirm]);

        core.step(SessionEvent::ProvisionFinished {
            entry: "demo".to_string(),
            result: ProvisionResult::failed(ProvisionFailure::NetworkUnavailable, "No network"),
        });
        assert_eq!(
            core.phase(),
            &Phase::EntryMenu {
                choice: MenuChoice::Run,
                notice: Some("No network".to_string())
            }
        );
        assert_eq!(
            core.catalog().get("demo").unwrap().install_state,
            InstallState::NotInstalled
        );
    }

    #[test]
    fn failed_install_can_be_retried() {
        let mut core = browsing(vec![entry("demo", true)]);
        press(&mut core, &[InputEvent::Confirm, InputEvent::Confirm, InputEvent::Confirm]);
        core.step(SessionEvent::ProvisionFinished {
            entry: "demo".to_string(),
            result: ProvisionResult::failed(ProvisionFailure::InstallFailed, "pip failed"),
        });
        assert_eq!(
            core.catalog().get("demo").unwrap().install_state,
            InstallState::Failed
        );

        let commands = press(&mut core, &[InputEvent::Confirm, InputEvent::Confirm]);
        assert_eq!(
            commands,
            vec![SessionCommand::Provision {
                entry: "demo".to_string()
            }]
        );
    }

    #[test]
    fn crash_notifies_and_expires() {
        let mut core = browsing(vec![entry("a", false)]);
        press(&mut core, &[InputEvent::Confirm, InputEvent::Confirm]);

        let step = core.step(SessionEvent::RunFinished {
            entry: "a".to_string(),
            outcome: ExitOutcome::Crashed("A crashed: boom".to_string()),
        });
        assert_eq!(step.commands, vec![SessionCommand::PlaySound(SoundCue::Notify)]);
        assert_eq!(core.phase(), &Phase::Browsing);
        assert_eq!(core.view().notifications, vec!["A crashed: boom".to_string()]);

        for _ in 0..3 {
            core.step(SessionEvent::Tick { online: true });
        }
        assert_eq!(core.notifications().count(), 0);
    }

    #[test]
    fn clean_exit_and_non_start_are_silent() {
        for outcome in [ExitOutcome::Clean, ExitOutcome::NotStarted("missing".to_string())] {
            let mut core = browsing(vec![entry("a", false)]);
            press(&mut core, &[InputEvent::Confirm, InputEvent::Confirm]);
            let step = core.step(SessionEvent::RunFinished {
                entry: "a".to_string(),
                outcome,
            });
            assert!(step.commands.is_empty());
            assert_eq!(core.phase(), &Phase::Browsing);
            assert_eq!(core.notifications().count(), 0);
        }
    }

    #[test]
    fn quit_stops_the_session() {
        let mut core = browsing(vec![entry("a", false)]);
        let step = core.step(SessionEvent::Input(InputEvent::Quit));
        assert!(!step.keep_running);
        assert_eq!(step.commands, vec![SessionCommand::Exit]);
        assert_eq!(core.phase(), &Phase::Stopped);
    }

    fn any_input() -> impl Strategy<Value = InputEvent> {
        prop_oneof![
            Just(InputEvent::Up),
            Just(InputEvent::Down),
            Just(InputEvent::Left),
            Just(InputEvent::Right),
            Just(InputEvent::Confirm),
            Just(InputEvent::Cancel),
        ]
    }

    proptest! {
        #[test]
        fn selection_stays_in_range_and_plain_entries_never_provision(
            count in 1usize..6,
            inputs in proptest::collection::vec(any_input(), 0..60),
        ) {
            let entries = (0..count).map(|i| entry(&format!("e{i}"), false)).collect();
            let mut core = browsing(entries);
            for input in inputs {
                let step = core.step(SessionEvent::Input(input));
                prop_assert!(core.selected() < count);
                for command in &step.commands {
                    prop_assert!(!matches!(command, SessionCommand::Provision { .. }), "plain entry produced a Provision command");
                    if let SessionCommand::Launch { entry } = command {
                        core.step(SessionEvent::RunFinished {
                            entry: entry.clone(),
                            outcome: ExitOutcome::Clean,
                        });
                    }
                }
            }
        }
    }
}
