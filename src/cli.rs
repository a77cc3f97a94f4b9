// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::ConfigOverrides;
use crate::types::{DetectionMode, EvictionPolicy};

/// Command-line arguments for `modelwatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "modelwatch",
    version,
    about = "Watch an MLflow artifact tree and publish each new model folder once it stops changing.",
    long_about = None
)]
pub struct CliArgs {
    /// Optional TOML config file. Environment variables and the flags below
    /// take precedence over it.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory tree to watch (default `/mlartifacts`, env `MLFLOW_ARTIFACTS_PATH`).
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Idle time before a folder counts as stable, e.g. `10s`, `500ms`.
    #[arg(long, value_name = "DURATION")]
    pub quiescence: Option<String>,

    /// How often each folder is checked in `poll` mode, e.g. `2s`.
    #[arg(long, value_name = "DURATION")]
    pub poll_interval: Option<String>,

    /// File that must exist inside a folder before it can fire.
    #[arg(long, value_name = "NAME")]
    pub ready_marker: Option<String>,

    /// Stability detection strategy: `poll` or `deadline`.
    #[arg(long, value_name = "MODE")]
    pub detection: Option<DetectionMode>,

    /// What happens to finished records: `never` or `after-resolution`.
    #[arg(long, value_name = "POLICY")]
    pub eviction: Option<EvictionPolicy>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `MODELWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Load and validate configuration, print it, and exit without watching.
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    /// The subset of flags that overlay the loaded configuration.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            root: self.root.clone(),
            quiescence_window: self.quiescence.clone(),
            poll_interval: self.poll_interval.clone(),
            ready_marker: self.ready_marker.clone(),
            detection: self.detection,
            eviction: self.eviction,
        }
    }
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
