// src/net/mod.rs

//! Background connectivity monitor.
//!
//! One tokio task probes a TCP address on an interval and stores the result
//! in a shared flag. It is the only writer; the session loop only reads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorOptions {
    /// `host:port` to connect to.
    pub probe_addr: String,
    pub poll_interval: Duration,
    pub probe_timeout: Duration,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            probe_addr: "1.1.1.1:53".to_string(),
            poll_interval: Duration::from_secs(3),
            probe_timeout: Duration::from_secs(2),
        }
    }
}

/// Read side of the connectivity flag.
#[derive(Debug, Clone)]
pub struct NetworkStatus {
    online: Arc<AtomicBool>,
}

impl NetworkStatus {
    /// A status that never changes. Used by tests and `--dry-run`.
    pub fn fixed(online: bool) -> Self {
        Self {
            online: Arc::new(AtomicBool::new(online)),
        }
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Relaxed)
    }
}

/// Single TCP connect attempt bounded by `timeout`.
pub async fn probe_once(addr: &str, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
        Ok(Ok(_)) => true,
        Ok(Err(err)) => {
            debug!(addr, error = %err, "connectivity probe failed");
            false
        }
        Err(_) => {
            debug!(addr, ?timeout, "connectivity probe timed out");
            false
        }
    }
}

/// Handle to the running monitor task.
#[derive(Debug)]
pub struct NetworkMonitor {
    status: NetworkStatus,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl NetworkMonitor {
    /// Probe once, then keep probing in the background.
    pub async fn start(options: MonitorOptions) -> Self {
        let online = Arc::new(AtomicBool::new(
            probe_once(&options.probe_addr, options.probe_timeout).await,
        ));
        info!(
            addr = %options.probe_addr,
            online = online.load(Ordering::Relaxed),
            "network monitor started"
        );

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(poll_loop(options, Arc::clone(&online), shutdown_rx));

        Self {
            status: NetworkStatus { online },
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn status(&self) -> NetworkStatus {
        self.status.clone()
    }

    /// Stop the background task and wait for it to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                warn!(error = %err, "network monitor task ended abnormally");
            }
        }
        info!("network monitor stopped");
    }
}

async fn poll_loop(
    options: MonitorOptions,
    online: Arc<AtomicBool>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut interval = tokio::time::interval(options.poll_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately and the initial probe already ran.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => break,
            _ = interval.tick() => {
                let now = probe_once(&options.probe_addr, options.probe_timeout).await;
                let before = online.swap(now, Ordering::Relaxed);
                if before != now {
                    info!(online = now, "connectivity changed");
                }
            }
        }
    }
}
