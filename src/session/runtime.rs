// src/session/runtime.rs

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::net::NetworkStatus;
use crate::present::assets::SoundHandle;
use crate::present::{AudioSink, Frame, InputEvent, InputSource, RenderSink};
use crate::provision::{layout, ProvisionFailure, ProvisionResult, Provisioner};
use crate::session::core::SessionCore;
use crate::session::{SessionCommand, SessionEvent, SoundCue};
use crate::supervise::{ExitOutcome, Supervisor};

/// Everything the shell talks to.
pub struct Ports {
    pub provisioner: Box<dyn Provisioner>,
    pub supervisor: Box<dyn Supervisor>,
    pub render: Box<dyn RenderSink>,
    pub audio: Box<dyn AudioSink>,
    pub input: Box<dyn InputSource>,
}

/// Sounds for each cue; a missing sound is skipped.
#[derive(Debug, Clone, Default)]
pub struct SoundBank {
    pub boot_chime: Option<SoundHandle>,
    pub notify: Option<SoundHandle>,
}

impl SoundBank {
    fn get(&self, cue: SoundCue) -> Option<&SoundHandle> {
        match cue {
            SoundCue::BootChime => self.boot_chime.as_ref(),
            SoundCue::Notify => self.notify.as_ref(),
        }
    }
}

/// Drives a [`SessionCore`] frame by frame and performs its commands.
///
/// Provisioning and child runs are awaited inline: while one is in flight
/// no frames are produced and no input is read. The last frame drawn before
/// the call is the progress indication.
pub struct Session {
    core: SessionCore,
    ports: Ports,
    network: NetworkStatus,
    frame_interval: Duration,
    sounds: SoundBank,
    shutdown_rx: Option<oneshot::Receiver<()>>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("core", &self.core)
            .field("frame_interval", &self.frame_interval)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(
        core: SessionCore,
        ports: Ports,
        network: NetworkStatus,
        frame_interval: Duration,
    ) -> Self {
        Self {
            core,
            ports,
            network,
            frame_interval,
            sounds: SoundBank::default(),
            shutdown_rx: None,
        }
    }

    pub fn with_sounds(mut self, sounds: SoundBank) -> Self {
        self.sounds = sounds;
        self
    }

    /// A signal that is turned into a quit request (e.g. Ctrl-C).
    pub fn with_shutdown(mut self, rx: oneshot::Receiver<()>) -> Self {
        self.shutdown_rx = Some(rx);
        self
    }

    pub fn core(&self) -> &SessionCore {
        &self.core
    }

    /// Frame loop. Returns the final core once a quit was processed.
    pub async fn run(mut self) -> SessionCore {
        info!(
            entries = self.core.catalog().len(),
            frame_interval = ?self.frame_interval,
            "session started"
        );
        let mut interval = tokio::time::interval(self.frame_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        'frames: loop {
            interval.tick().await;

            let mut inputs = self.ports.input.poll();
            if self.shutdown_requested() {
                inputs.push(InputEvent::Quit);
            }
            for input in inputs {
                if !self.handle(SessionEvent::Input(input)).await {
                    break 'frames;
                }
            }

            let online = self.network.is_online();
            if !self.handle(SessionEvent::Tick { online }).await {
                break;
            }
            self.render();
        }

        info!("session ended");
        self.core
    }

    /// Feed one event through the core, performing every resulting command
    /// and any follow-up events. Returns whether the session continues.
    pub async fn handle(&mut self, event: SessionEvent) -> bool {
        let mut pending = VecDeque::from([event]);
        while let Some(event) = pending.pop_front() {
            debug!(?event, "session event");
            let step = self.core.step(event);
            for command in step.commands {
                if let Some(follow_up) = self.execute(command).await {
                    pending.push_back(follow_up);
                }
            }
            if !step.keep_running {
                return false;
            }
        }
        true
    }

    fn shutdown_requested(&mut self) -> bool {
        match self.shutdown_rx.as_mut().map(|rx| rx.try_recv()) {
            Some(Ok(())) => {
                info!("shutdown signal received");
                self.shutdown_rx = None;
                true
            }
            _ => false,
        }
    }

    fn render(&mut self) {
        let frame = Frame::compose(&self.core.view());
        self.ports.render.present(&frame);
    }

    async fn execute(&mut self, command: SessionCommand) -> Option<SessionEvent> {
        match command {
            SessionCommand::Provision { entry: id } => {
                self.render();
                let Some(entry) = self.core.catalog().get(&id).cloned() else {
                    warn!(entry = %id, "provision requested for unknown entry");
                    return Some(SessionEvent::ProvisionFinished {
                        entry: id,
                        result: ProvisionResult::failed(
                            ProvisionFailure::ManifestMissing,
                            "Unknown entry",
                        ),
                    });
                };
                let online = self.network.is_online();
                let result = self.ports.provisioner.provision(&entry, online).await;
                info!(entry = %id, success = result.success, message = %result.message, "provisioning finished");
                if let Some(tail) = &result.stderr_tail {
                    debug!(entry = %id, "installer tail:\n{tail}");
                }
                Some(SessionEvent::ProvisionFinished { entry: id, result })
            }
            SessionCommand::Launch { entry: id } => {
                self.render();
                let Some(entry) = self.core.catalog().get(&id).cloned() else {
                    warn!(entry = %id, "launch requested for unknown entry");
                    return Some(SessionEvent::RunFinished {
                        entry: id,
                        outcome: ExitOutcome::NotStarted("unknown entry".to_string()),
                    });
                };
                let environment = if entry.requires_isolated_env {
                    layout::environment_handle(&entry.dir)
                } else {
                    None
                };
                let outcome = self.ports.supervisor.run(&entry, environment).await;
                Some(SessionEvent::RunFinished { entry: id, outcome })
            }
            SessionCommand::PlaySound(cue) => {
                match self.sounds.get(cue) {
                    Some(sound) => self.ports.audio.play(sound),
                    None => debug!(?cue, "no sound loaded for cue"),
                }
                None
            }
            SessionCommand::Exit => {
                info!("exit requested");
                None
            }
        }
    }
}
