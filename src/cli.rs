// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `kiosk`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "kiosk",
    version,
    about = "Browse, install and run local applications on a kiosk device.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the launcher config file (TOML).
    ///
    /// Default: `Kiosk.toml` in the current working directory. A missing
    /// file means built-in defaults.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Catalog directory; overrides `[catalog].root`.
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `KIOSK_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Go straight to browsing without the logo animation.
    #[arg(long)]
    pub skip_boot: bool,

    /// Scan the catalog, print it, and exit without running anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
