// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{AppConfig, RawConfigFile};
use crate::errors::{ModelwatchError, Result};
use crate::types::{DetectionMode, EvictionPolicy};

pub const ENV_ROOT: &str = "MLFLOW_ARTIFACTS_PATH";
pub const ENV_ANCESTOR: &str = "MLFLOW_ROOT_NAME";
pub const ENV_REGISTRY: &str = "REGISTRY";
pub const ENV_NAMESPACE: &str = "REGISTRY_NAMESPACE";
pub const ENV_USERNAME: &str = "REGISTRY_USERNAME";
pub const ENV_PASSWORD: &str = "REGISTRY_PASSWORD";
pub const ENV_QUIESCENCE: &str = "QUIESCENCE_WINDOW";
pub const ENV_POLL: &str = "POLL_INTERVAL";
pub const ENV_READY_MARKER: &str = "READY_MARKER";

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_config`] for the full layered load.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Values given on the command line. They win over both file and environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub root: Option<PathBuf>,
    pub quiescence_window: Option<String>,
    pub poll_interval: Option<String>,
    pub ready_marker: Option<String>,
    pub detection: Option<DetectionMode>,
    pub eviction: Option<EvictionPolicy>,
}

/// Overlay environment variables onto a raw config.
///
/// `lookup` is usually `|k| std::env::var(k).ok()`; tests pass a map instead
/// of mutating the process environment. Empty values are treated as unset.
pub fn apply_env<F>(raw: &mut RawConfigFile, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(root) = get(ENV_ROOT) {
        raw.watcher.root = PathBuf::from(root);
    }
    if let Some(ancestor) = get(ENV_ANCESTOR) {
        raw.watcher.ancestor_segment = ancestor;
    }
    if let Some(window) = get(ENV_QUIESCENCE) {
        raw.watcher.quiescence_window = window;
    }
    if let Some(poll) = get(ENV_POLL) {
        raw.watcher.poll_interval = poll;
    }
    if let Some(marker) = get(ENV_READY_MARKER) {
        raw.watcher.ready_marker = Some(marker);
    }
    if let Some(url) = get(ENV_REGISTRY) {
        raw.registry.url = url;
    }
    if let Some(namespace) = get(ENV_NAMESPACE) {
        raw.registry.namespace = Some(namespace);
    }
    if let Some(username) = get(ENV_USERNAME) {
        raw.registry.username = Some(username);
    }
    if let Some(password) = get(ENV_PASSWORD) {
        raw.registry.password = Some(password);
    }
}

/// Overlay CLI values onto a raw config.
pub fn apply_overrides(raw: &mut RawConfigFile, overrides: ConfigOverrides) {
    if let Some(root) = overrides.root {
        raw.watcher.root = root;
    }
    if let Some(window) = overrides.quiescence_window {
        raw.watcher.quiescence_window = window;
    }
    if let Some(poll) = overrides.poll_interval {
        raw.watcher.poll_interval = poll;
    }
    if let Some(marker) = overrides.ready_marker {
        raw.watcher.ready_marker = Some(marker);
    }
    if let Some(detection) = overrides.detection {
        raw.watcher.detection = detection;
    }
    if let Some(eviction) = overrides.eviction {
        raw.watcher.eviction = eviction;
    }
}

/// Build the validated process configuration.
///
/// Layers, lowest precedence first:
/// - built-in defaults,
/// - the TOML file at `path` (if given),
/// - environment variables via `lookup`,
/// - CLI `overrides`.
pub fn load_config<F>(
    path: Option<&Path>,
    lookup: F,
    overrides: ConfigOverrides,
) -> Result<AppConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut raw = match path {
        Some(path) => {
            if !path.is_file() {
                return Err(ModelwatchError::ConfigError(format!(
                    "config file {:?} does not exist",
                    path
                )));
            }
            debug!(?path, "loading config file");
            load_from_path(path)?
        }
        None => RawConfigFile::default(),
    };

    apply_env(&mut raw, lookup);
    apply_overrides(&mut raw, overrides);

    AppConfig::try_from(raw)
}

/// Convenience wrapper reading the real process environment.
pub fn load_from_process_env(
    path: Option<&Path>,
    overrides: ConfigOverrides,
) -> Result<AppConfig> {
    load_config(path, |key| std::env::var(key).ok(), overrides)
}
