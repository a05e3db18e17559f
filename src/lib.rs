// src/lib.rs

pub mod catalog;
pub mod cli;
pub mod config;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod net;
pub mod present;
pub mod provision;
pub mod runtime;
pub mod session;
pub mod supervise;
pub mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, Scanner, Thumbnail};
use crate::cli::CliArgs;
use crate::config::KioskConfig;
use crate::fs::RealFileSystem;
use crate::net::NetworkMonitor;
use crate::present::assets::{AssetLoader, FsAssetLoader};
use crate::present::terminal::{LogAudio, StdinInput, TerminalRenderer};
use crate::provision::EnvProvisioner;
use crate::runtime::RuntimeResolver;
use crate::session::{Ports, Session, SessionCore, SessionOptions, SoundBank};
use crate::supervise::ProcessSupervisor;

const BOOT_CHIME: &str = "boot.wav";
const NOTIFY_SOUND: &str = "notify.wav";

/// Resolve the config path from the CLI, falling back to `Kiosk.toml`.
pub fn config_path(args: &CliArgs) -> PathBuf {
    args.config
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(config::default_config_path)
}

/// Apply CLI overrides on top of the file configuration.
pub fn apply_overrides(cfg: &mut KioskConfig, args: &CliArgs) {
    if let Some(root) = &args.root {
        cfg.catalog_root = root.clone();
    }
    if args.skip_boot {
        cfg.session.skip_boot = true;
    }
}

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - catalog scanning
/// - the network monitor
/// - provisioner and supervisor
/// - the session loop with terminal presentation
/// - Ctrl-C handling
pub async fn run(args: CliArgs, cfg: KioskConfig) -> Result<()> {
    info!(
        config = ?config_path(&args),
        root = ?cfg.catalog_root,
        "kiosk starting"
    );

    let fs = Arc::new(RealFileSystem);
    let assets = FsAssetLoader::new(fs.clone(), cfg.assets_dir.clone());
    let catalog = Scanner::new(fs.as_ref(), &assets).scan(&cfg.catalog_root)?;

    if args.dry_run {
        print_dry_run(&cfg, &catalog);
        return Ok(());
    }

    let monitor = NetworkMonitor::start(cfg.network.clone()).await;
    let network = monitor.status();

    let resolver = RuntimeResolver::new(cfg.runtime.clone());
    let ports = Ports {
        provisioner: Box::new(EnvProvisioner::new(resolver, cfg.runtime.install_timeout)),
        supervisor: Box::new(ProcessSupervisor::new(cfg.supervisor.clone())),
        render: Box::new(TerminalRenderer::new()),
        audio: Box::new(LogAudio),
        input: Box::new(StdinInput::spawn()),
    };

    let options = SessionOptions {
        notification_ttl_ticks: cfg.session.notification_ttl_ticks(),
        skip_boot: cfg.session.skip_boot,
    };
    let core = SessionCore::new(catalog, options, network.is_online());

    // Ctrl-C → quit through the session so the monitor is torn down.
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            return;
        }
        let _ = shutdown_tx.send(());
    });

    let session = Session::new(core, ports, network, cfg.session.frame_interval())
        .with_sounds(load_sounds(&assets))
        .with_shutdown(shutdown_rx);
    session.run().await;

    monitor.shutdown().await;
    info!("kiosk stopped");
    Ok(())
}

fn load_sounds(assets: &dyn AssetLoader) -> SoundBank {
    let load = |name: &str| match assets.load_sound(Path::new(name)) {
        Ok(sound) => Some(sound),
        Err(err) => {
            warn!(sound = name, error = %err, "sound unavailable");
            None
        }
    };
    SoundBank {
        boot_chime: load(BOOT_CHIME),
        notify: load(NOTIFY_SOUND),
    }
}

/// Simple dry-run output: print the scanned catalog.
fn print_dry_run(cfg: &KioskConfig, catalog: &Catalog) {
    println!("kiosk dry-run");
    println!("  catalog.root = {}", cfg.catalog_root.display());
    println!("  network.probe_addr = {}", cfg.network.probe_addr);
    println!();

    println!("entries ({}):", catalog.len());
    for entry in catalog.iter() {
        println!("  - {}", entry.id);
        println!("      name: {}", entry.display_name);
        println!("      kind: {}", entry.run_kind.as_str());
        println!("      install_state: {:?}", entry.install_state);
        if let Some(version) = &entry.requested_runtime_version {
            println!("      runtime_version: {version}");
        }
        if let Thumbnail::Fallback { requested, reason } = &entry.thumbnail {
            println!("      thumbnail: {} (fallback: {reason})", requested.display());
        }
    }

    debug!("dry-run complete (nothing launched)");
}
