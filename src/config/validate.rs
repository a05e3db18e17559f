// src/config/validate.rs

use std::path::PathBuf;
use std::time::Duration;

use crate::config::model::{KioskConfig, RawKioskConfig, SessionSettings};
use crate::errors::{KioskError, Result};
use crate::net::MonitorOptions;
use crate::runtime::ResolverOptions;
use crate::supervise::{BenignStderr, SupervisorOptions};

impl TryFrom<RawKioskConfig> for KioskConfig {
    type Error = crate::errors::KioskError;

    fn try_from(raw: RawKioskConfig) -> std::result::Result<Self, Self::Error> {
        let session = validate_session(&raw)?;
        let network = validate_network(&raw)?;
        let runtime = validate_runtime(&raw)?;
        let supervisor = validate_supervisor(&raw)?;

        Ok(KioskConfig {
            catalog_root: raw.catalog.root,
            assets_dir: raw.catalog.assets,
            session,
            network,
            runtime,
            supervisor,
        })
    }
}

fn validate_session(cfg: &RawKioskConfig) -> Result<SessionSettings> {
    let s = &cfg.session;
    if s.fps == 0 {
        return Err(KioskError::ConfigError(
            "[session].fps must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(SessionSettings {
        fps: s.fps,
        notification_ttl: duration_field("session", "notification_ttl", &s.notification_ttl)?,
        skip_boot: s.skip_boot,
        session_log: non_empty(&s.session_log).map(PathBuf::from),
    })
}

fn validate_network(cfg: &RawKioskConfig) -> Result<MonitorOptions> {
    let n = &cfg.network;
    if !n.probe_addr.contains(':') {
        return Err(KioskError::ConfigError(format!(
            "[network].probe_addr must be host:port (got '{}')",
            n.probe_addr
        )));
    }

    Ok(MonitorOptions {
        probe_addr: n.probe_addr.clone(),
        poll_interval: duration_field("network", "poll_interval", &n.poll_interval)?,
        probe_timeout: duration_field("network", "probe_timeout", &n.probe_timeout)?,
    })
}

fn validate_runtime(cfg: &RawKioskConfig) -> Result<ResolverOptions> {
    let r = &cfg.runtime;
    Ok(ResolverOptions {
        probe_timeout: duration_field("runtime", "probe_timeout", &r.probe_timeout)?,
        install_timeout: duration_field("runtime", "install_timeout", &r.install_timeout)?,
        version_manager: non_empty(&r.version_manager).map(str::to_string),
        launcher: non_empty(&r.launcher).map(str::to_string),
        common_locations: r.common_locations.clone(),
        search_path: None,
    })
}

fn validate_supervisor(cfg: &RawKioskConfig) -> Result<SupervisorOptions> {
    let s = &cfg.supervisor;
    let benign = BenignStderr::new(&s.benign_stderr).map_err(|e| {
        KioskError::ConfigError(format!("[supervisor].benign_stderr: invalid regex: {e}"))
    })?;
    let raise_window_after = match non_empty(&s.raise_window_after) {
        Some(text) => Some(duration_field("supervisor", "raise_window_after", text)?),
        None => None,
    };

    Ok(SupervisorOptions {
        benign,
        raise_window_after,
        device_mode: s.device_mode,
        env: s.env.clone(),
    })
}

fn non_empty(s: &str) -> Option<&str> {
    let s = s.trim();
    if s.is_empty() { None } else { Some(s) }
}

fn duration_field(section: &str, key: &str, value: &str) -> Result<Duration> {
    parse_duration(value)
        .map_err(|e| KioskError::ConfigError(format!("[{section}].{key}: {e}")))
}

/// Parse durations like `"500ms"`, `"3s"`, `"15m"`, `"1h"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    let digits = s.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return Err(format!("duration '{s}' must start with a number"));
    }

    let (amount, unit) = s.split_at(digits);
    let amount: u64 = amount
        .parse()
        .map_err(|e| format!("duration '{s}': {e}"))?;

    let millis_per_unit = match unit.trim().to_ascii_lowercase().as_str() {
        "ms" => 1,
        "s" => 1_000,
        "m" => 60_000,
        "h" => 3_600_000,
        "" => return Err(format!("duration '{s}' needs a unit (ms, s, m or h)")),
        other => return Err(format!("duration '{s}' has unknown unit '{other}'")),
    };
    amount
        .checked_mul(millis_per_unit)
        .map(Duration::from_millis)
        .ok_or_else(|| format!("duration '{s}' is too large"))
}
