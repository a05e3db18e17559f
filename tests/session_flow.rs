// tests/session_flow.rs
#![cfg(unix)]

mod common;
use crate::common::{
    CatalogEntryBuilder, FakeProvisioner, FakeSupervisor, RecordingAudio, RecordingRenderer,
    ScriptedInput, TempCatalog, fake_python, init_tracing, isolated_resolver, with_timeout,
};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use kiosk::catalog::Catalog;
use kiosk::net::NetworkStatus;
use kiosk::present::{Frame, InputEvent};
use kiosk::present::assets::SoundHandle;
use kiosk::provision::{layout, EnvProvisioner, Provisioner};
use kiosk::runtime::{RuntimeHandle, RuntimeResolver};
use kiosk::session::{
    MenuChoice, Phase, Ports, Session, SessionCore, SessionEvent, SessionOptions, SoundBank,
};
use kiosk::supervise::{
    BenignStderr, ExitOutcome, ProcessSupervisor, Supervisor, SupervisorOptions,
};
use kiosk::types::{DeviceMode, InstallState};

const FRAME: Duration = Duration::from_millis(1);

fn options() -> SessionOptions {
    SessionOptions {
        notification_ttl_ticks: 240,
        skip_boot: true,
    }
}

fn ports(
    provisioner: impl Provisioner + 'static,
    supervisor: impl Supervisor + 'static,
    render: RecordingRenderer,
    audio: RecordingAudio,
    input: ScriptedInput,
) -> Ports {
    Ports {
        provisioner: Box::new(provisioner),
        supervisor: Box::new(supervisor),
        render: Box::new(render),
        audio: Box::new(audio),
        input: Box::new(input),
    }
}

fn real_supervisor() -> ProcessSupervisor {
    ProcessSupervisor::new(SupervisorOptions {
        benign: BenignStderr::empty(),
        raise_window_after: None,
        device_mode: DeviceMode::Off,
        ..SupervisorOptions::default()
    })
}

fn real_provisioner(tools: &Path, pip_exit: i32) -> EnvProvisioner {
    let bin = tools.join("bin");
    fs::create_dir_all(&bin).unwrap();
    if pip_exit >= 0 {
        fake_python(&bin.join("python3"), "3.11", pip_exit);
    }
    let resolver = RuntimeResolver::new(isolated_resolver(&bin, Vec::new()));
    EnvProvisioner::new(resolver, Duration::from_secs(10))
}

fn demo_catalog() -> TempCatalog {
    let catalog_dir = TempCatalog::new();
    catalog_dir.add_script("demo", "print('demo')\n");
    catalog_dir.write("demo", "requirements.txt", "pygame\n");
    catalog_dir.write("demo", "entry.toml", "name = \"Demo\"\n");
    catalog_dir
}

async fn press(session: &mut Session, input: InputEvent) -> bool {
    with_timeout(session.handle(SessionEvent::Input(input))).await
}

#[tokio::test]
async fn offline_install_returns_to_the_menu_with_a_notice() {
    init_tracing();
    let tools = tempfile::tempdir().unwrap();
    let catalog_dir = demo_catalog();
    let runs = Arc::new(Mutex::new(Vec::new()));
    let render = RecordingRenderer::default();

    let core = SessionCore::new(catalog_dir.scan(), options(), false);
    let ports = ports(
        real_provisioner(tools.path(), -1),
        FakeSupervisor::new(runs.clone()),
        render.clone(),
        RecordingAudio::default(),
        ScriptedInput::new(Vec::new()),
    );
    let mut session = Session::new(core, ports, NetworkStatus::fixed(false), FRAME);

    assert!(press(&mut session, InputEvent::Confirm).await);
    assert!(press(&mut session, InputEvent::Confirm).await);
    assert_eq!(session.core().phase(), &Phase::InstallPrompt { installing: false });

    assert!(press(&mut session, InputEvent::Confirm).await);
    match session.core().phase() {
        Phase::EntryMenu { choice, notice } => {
            assert_eq!(*choice, MenuChoice::Run);
            let notice = notice.as_deref().unwrap_or_default();
            assert!(notice.starts_with("No network connection"), "notice: {notice}");
        }
        other => panic!("expected entry menu, got {other:?}"),
    }

    let entry = session.core().catalog().get("demo").unwrap();
    assert_eq!(entry.install_state, InstallState::NotInstalled);
    assert!(!entry.dir.join(".venv").exists());
    assert!(render.saw_text("Installing Demo"));
    assert!(runs.lock().unwrap().is_empty());
}

#[tokio::test]
async fn provisioned_entry_runs_cleanly_and_returns_to_browsing() {
    init_tracing();
    let tools = tempfile::tempdir().unwrap();
    let catalog_dir = demo_catalog();
    let render = RecordingRenderer::default();

    let core = SessionCore::new(catalog_dir.scan(), options(), true);
    let ports = ports(
        real_provisioner(tools.path(), 0),
        real_supervisor(),
        render.clone(),
        RecordingAudio::default(),
        ScriptedInput::new(Vec::new()),
    );
    let mut session = Session::new(core, ports, NetworkStatus::fixed(true), FRAME);

    for _ in 0..3 {
        assert!(press(&mut session, InputEvent::Confirm).await);
    }

    assert_eq!(session.core().phase(), &Phase::Browsing);
    assert_eq!(session.core().notifications().count(), 0);
    let entry = session.core().catalog().get("demo").unwrap();
    assert_eq!(entry.install_state, InstallState::Installed);
    assert!(entry.dir.join(".venv/bin/python").is_file());
    assert!(render.saw_text("Running Demo"));
}

#[tokio::test]
async fn already_provisioned_entry_launches_in_its_environment() {
    init_tracing();
    let catalog_dir = demo_catalog();
    let env = layout::env_dir(&catalog_dir.entry_dir("demo"));
    let interpreter = fake_python(&layout::env_interpreter(&env), "3.11", 0);
    fs::write(env.join("pyvenv.cfg"), "home = /usr/bin\nversion = 3.11.4\n").unwrap();
    fs::write(layout::marker_path(&env), layout::manifest_digest(b"pygame\n")).unwrap();

    let catalog = catalog_dir.scan();
    assert_eq!(catalog.get("demo").unwrap().install_state, InstallState::Installed);

    let calls = Arc::new(Mutex::new(Vec::new()));
    let runs = Arc::new(Mutex::new(Vec::new()));
    let render = RecordingRenderer::default();
    let core = SessionCore::new(catalog, options(), true);
    let ports = ports(
        FakeProvisioner::new(calls.clone()),
        FakeSupervisor::new(runs.clone()),
        render.clone(),
        RecordingAudio::default(),
        ScriptedInput::new(Vec::new()),
    );
    let mut session = Session::new(core, ports, NetworkStatus::fixed(true), FRAME);

    assert!(press(&mut session, InputEvent::Confirm).await);
    assert!(press(&mut session, InputEvent::Confirm).await);

    assert_eq!(session.core().phase(), &Phase::Browsing);
    assert_eq!(session.core().notifications().count(), 0);
    assert!(render.saw_text("Running Demo"));
    assert!(calls.lock().unwrap().is_empty());

    let expected = RuntimeHandle {
        path: interpreter,
        reported_version: "3.11".to_string(),
    };
    assert_eq!(
        *runs.lock().unwrap(),
        vec![("demo".to_string(), Some(expected))]
    );
}

#[tokio::test]
async fn failed_install_marks_the_entry_and_can_be_retried() {
    init_tracing();
    let tools = tempfile::tempdir().unwrap();
    let catalog_dir = demo_catalog();

    let core = SessionCore::new(catalog_dir.scan(), options(), true);
    let ports = ports(
        real_provisioner(tools.path(), 1),
        real_supervisor(),
        RecordingRenderer::default(),
        RecordingAudio::default(),
        ScriptedInput::new(Vec::new()),
    );
    let mut session = Session::new(core, ports, NetworkStatus::fixed(true), FRAME);

    // Browse -> menu -> prompt -> install (fails).
    for _ in 0..3 {
        assert!(press(&mut session, InputEvent::Confirm).await);
    }
    let entry = session.core().catalog().get("demo").unwrap();
    assert_eq!(entry.install_state, InstallState::Failed);

    // Menu "Run" -> prompt again -> install (fails again).
    for _ in 0..2 {
        assert!(press(&mut session, InputEvent::Confirm).await);
    }
    let entry = session.core().catalog().get("demo").unwrap();
    assert_eq!(entry.install_state, InstallState::Failed);
    assert!(!entry.dir.join(".venv").exists());
    assert!(matches!(session.core().phase(), Phase::EntryMenu { notice: Some(_), .. }));
}

#[tokio::test]
async fn shared_runtime_entries_never_provision() {
    init_tracing();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let runs = Arc::new(Mutex::new(Vec::new()));
    let catalog = Catalog::new(vec![
        CatalogEntryBuilder::new("pong").build(),
        CatalogEntryBuilder::new("snake").binary().build(),
    ])
    .unwrap();

    let core = SessionCore::new(catalog, options(), true);
    let ports = ports(
        FakeProvisioner::new(calls.clone()),
        FakeSupervisor::new(runs.clone()),
        RecordingRenderer::default(),
        RecordingAudio::default(),
        ScriptedInput::new(Vec::new()),
    );
    let mut session = Session::new(core, ports, NetworkStatus::fixed(true), FRAME);

    for input in [InputEvent::Confirm, InputEvent::Confirm, InputEvent::Down] {
        assert!(press(&mut session, input).await);
    }
    for _ in 0..2 {
        assert!(press(&mut session, InputEvent::Confirm).await);
    }

    assert!(calls.lock().unwrap().is_empty());
    let runs = runs.lock().unwrap();
    let ran: Vec<_> = runs.iter().map(|(id, env)| (id.as_str(), env.is_none())).collect();
    assert_eq!(ran, vec![("pong", true), ("snake", true)]);
}

#[tokio::test]
async fn crash_posts_a_notification_and_plays_the_cue() {
    init_tracing();
    let runs = Arc::new(Mutex::new(Vec::new()));
    let audio = RecordingAudio::default();
    let render = RecordingRenderer::default();
    let catalog = Catalog::new(vec![CatalogEntryBuilder::new("pong").name("Pong").build()]).unwrap();

    let core = SessionCore::new(catalog, options(), true);
    let ports = ports(
        FakeProvisioner::new(Arc::new(Mutex::new(Vec::new()))),
        FakeSupervisor::new(runs).then(ExitOutcome::Crashed(
            "Pong crashed: ZeroDivisionError: division by zero".to_string(),
        )),
        render.clone(),
        audio.clone(),
        ScriptedInput::new(Vec::new()),
    );
    let notify = PathBuf::from("/assets/notify.wav");
    let mut session = Session::new(core, ports, NetworkStatus::fixed(true), FRAME).with_sounds(
        SoundBank {
            boot_chime: None,
            notify: Some(SoundHandle {
                path: notify.clone(),
            }),
        },
    );

    assert!(press(&mut session, InputEvent::Confirm).await);
    assert!(press(&mut session, InputEvent::Confirm).await);

    assert_eq!(session.core().phase(), &Phase::Browsing);
    let messages: Vec<_> = session
        .core()
        .notifications()
        .map(|n| n.message.clone())
        .collect();
    assert_eq!(messages, vec!["Pong crashed: ZeroDivisionError: division by zero"]);
    assert_eq!(*audio.played.lock().unwrap(), vec![notify]);

    let frame = Frame::compose(&session.core().view());
    assert!(frame.texts().any(|t| t.starts_with("Pong crashed")));
}

#[tokio::test]
async fn frame_loop_runs_scripted_input_until_quit() {
    init_tracing();
    let runs = Arc::new(Mutex::new(Vec::new()));
    let render = RecordingRenderer::default();
    let catalog = Catalog::new(vec![
        CatalogEntryBuilder::new("pong").name("Pong").build(),
        CatalogEntryBuilder::new("snake").name("Snake").build(),
    ])
    .unwrap();

    let core = SessionCore::new(catalog, options(), true);
    let ports = ports(
        FakeProvisioner::new(Arc::new(Mutex::new(Vec::new()))),
        FakeSupervisor::new(runs.clone()),
        render.clone(),
        RecordingAudio::default(),
        ScriptedInput::keys(&[InputEvent::Down, InputEvent::Confirm, InputEvent::Confirm]),
    );
    let session = Session::new(core, ports, NetworkStatus::fixed(true), FRAME);

    let core = with_timeout(session.run()).await;

    assert_eq!(core.phase(), &Phase::Stopped);
    assert_eq!(core.selected(), 1);
    assert_eq!(runs.lock().unwrap().len(), 1);
    assert_eq!(runs.lock().unwrap()[0].0, "snake");
    assert!(render.saw_text("Running Snake"));
    assert!(!render.frames.lock().unwrap().is_empty());
}
