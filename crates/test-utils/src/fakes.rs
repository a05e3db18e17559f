//! Fake ports for driving a `Session` without processes or a terminal.

use std::collections::VecDeque;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use kiosk::catalog::CatalogEntry;
use kiosk::present::assets::SoundHandle;
use kiosk::present::{AudioSink, Frame, InputEvent, InputSource, RenderSink};
use kiosk::provision::{ProvisionFailure, ProvisionResult, Provisioner};
use kiosk::runtime::RuntimeHandle;
use kiosk::supervise::{ExitOutcome, Supervisor};

/// Provisioner that records calls and answers from a script.
///
/// Like the real one, it refuses while offline. Once the scripted results
/// run out it reports success.
pub struct FakeProvisioner {
    results: VecDeque<ProvisionResult>,
    calls: Arc<Mutex<Vec<(String, bool)>>>,
}

impl FakeProvisioner {
    pub fn new(calls: Arc<Mutex<Vec<(String, bool)>>>) -> Self {
        Self {
            results: VecDeque::new(),
            calls,
        }
    }

    pub fn then(mut self, result: ProvisionResult) -> Self {
        self.results.push_back(result);
        self
    }
}

impl Provisioner for FakeProvisioner {
    fn provision<'a>(
        &'a mut self,
        entry: &'a CatalogEntry,
        online: bool,
    ) -> Pin<Box<dyn Future<Output = ProvisionResult> + Send + 'a>> {
        self.calls.lock().unwrap().push((entry.id.clone(), online));
        let result = if !online {
            ProvisionResult::failed(
                ProvisionFailure::NetworkUnavailable,
                "No network connection: connect to the internet to install",
            )
        } else {
            self.results
                .pop_front()
                .unwrap_or_else(|| ProvisionResult::installed(&entry.display_name))
        };
        Box::pin(async move { result })
    }
}

/// Supervisor that records runs and returns scripted outcomes
/// (`Clean` once the script is exhausted).
pub struct FakeSupervisor {
    outcomes: VecDeque<ExitOutcome>,
    runs: Arc<Mutex<Vec<(String, Option<RuntimeHandle>)>>>,
}

impl FakeSupervisor {
    pub fn new(runs: Arc<Mutex<Vec<(String, Option<RuntimeHandle>)>>>) -> Self {
        Self {
            outcomes: VecDeque::new(),
            runs,
        }
    }

    pub fn then(mut self, outcome: ExitOutcome) -> Self {
        self.outcomes.push_back(outcome);
        self
    }
}

impl Supervisor for FakeSupervisor {
    fn run<'a>(
        &'a mut self,
        entry: &'a CatalogEntry,
        environment: Option<RuntimeHandle>,
    ) -> Pin<Box<dyn Future<Output = ExitOutcome> + Send + 'a>> {
        self.runs.lock().unwrap().push((entry.id.clone(), environment));
        let outcome = self.outcomes.pop_front().unwrap_or(ExitOutcome::Clean);
        Box::pin(async move { outcome })
    }
}

/// Yields one batch of events per poll, then `Quit` forever.
pub struct ScriptedInput {
    frames: VecDeque<Vec<InputEvent>>,
}

impl ScriptedInput {
    pub fn new(frames: Vec<Vec<InputEvent>>) -> Self {
        Self {
            frames: frames.into(),
        }
    }

    /// One event per frame.
    pub fn keys(keys: &[InputEvent]) -> Self {
        Self::new(keys.iter().map(|k| vec![*k]).collect())
    }
}

impl InputSource for ScriptedInput {
    fn poll(&mut self) -> Vec<InputEvent> {
        self.frames
            .pop_front()
            .unwrap_or_else(|| vec![InputEvent::Quit])
    }
}

#[derive(Clone, Default)]
pub struct RecordingRenderer {
    pub frames: Arc<Mutex<Vec<Frame>>>,
}

impl RenderSink for RecordingRenderer {
    fn present(&mut self, frame: &Frame) {
        self.frames.lock().unwrap().push(frame.clone());
    }
}

impl RecordingRenderer {
    /// Whether any presented frame contained `needle` in a text layer.
    pub fn saw_text(&self, needle: &str) -> bool {
        self.frames
            .lock()
            .unwrap()
            .iter()
            .any(|f| f.texts().any(|t| t.contains(needle)))
    }
}

#[derive(Clone, Default)]
pub struct RecordingAudio {
    pub played: Arc<Mutex<Vec<PathBuf>>>,
}

impl AudioSink for RecordingAudio {
    fn play(&mut self, sound: &SoundHandle) {
        self.played.lock().unwrap().push(sound.path.clone());
    }
}
