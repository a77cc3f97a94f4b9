// src/config/model.rs

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::types::{DetectionMode, EvictionPolicy};

/// Top-level configuration as read from an (optional) TOML file.
///
/// ```toml
/// [watcher]
/// root = "/mlartifacts"
/// quiescence_window = "10s"
/// poll_interval = "2s"
/// ancestor_segment = "mlartifacts"
/// leaf_name = "model"
/// ready_marker = "MLmodel"
/// detection = "poll"
/// eviction = "never"
///
/// [registry]
/// url = "docker.io"
/// namespace = "acme"
/// username = "bot"
/// ```
///
/// All sections and keys are optional. Environment variables and CLI flags
/// are layered on top of this by the loader before validation.
///
/// This is the *raw* shape; it becomes an [`AppConfig`] only through
/// `AppConfig::try_from`, which performs validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub watcher: WatcherSection,

    #[serde(default)]
    pub registry: RegistrySection,
}

/// `[watcher]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatcherSection {
    /// Directory observed recursively.
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Minimum idle time before a candidate counts as stable (`"10s"`).
    #[serde(default = "default_quiescence_window")]
    pub quiescence_window: String,

    /// Time between stability checks (`"2s"`).
    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,

    /// Path component that must appear somewhere above a candidate.
    #[serde(default = "default_ancestor_segment")]
    pub ancestor_segment: String,

    /// Required name of the candidate folder itself.
    #[serde(default = "default_leaf_name")]
    pub leaf_name: String,

    /// Optional file that must exist inside a candidate before it may fire.
    #[serde(default)]
    pub ready_marker: Option<String>,

    #[serde(default)]
    pub detection: DetectionMode,

    #[serde(default)]
    pub eviction: EvictionPolicy,
}

fn default_root() -> PathBuf {
    PathBuf::from("/mlartifacts")
}

fn default_quiescence_window() -> String {
    "10s".to_string()
}

fn default_poll_interval() -> String {
    "2s".to_string()
}

fn default_ancestor_segment() -> String {
    "mlartifacts".to_string()
}

fn default_leaf_name() -> String {
    "model".to_string()
}

impl Default for WatcherSection {
    fn default() -> Self {
        Self {
            root: default_root(),
            quiescence_window: default_quiescence_window(),
            poll_interval: default_poll_interval(),
            ancestor_segment: default_ancestor_segment(),
            leaf_name: default_leaf_name(),
            ready_marker: None,
            detection: DetectionMode::default(),
            eviction: EvictionPolicy::default(),
        }
    }
}

/// `[registry]` section.
///
/// Credentials are usually supplied through the environment rather than the
/// file; they are only required when the process actually publishes.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistrySection {
    #[serde(default = "default_registry_url")]
    pub url: String,

    #[serde(default)]
    pub namespace: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

fn default_registry_url() -> String {
    "docker.io".to_string()
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self {
            url: default_registry_url(),
            namespace: None,
            username: None,
            password: None,
        }
    }
}

impl fmt::Debug for RegistrySection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrySection")
            .field("url", &self.url)
            .field("namespace", &self.namespace)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Validated, process-wide configuration. Read-only after startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub watcher: WatcherConfig,
    pub registry: RegistrySection,
}

/// Settings consumed by the detection engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatcherConfig {
    pub root: PathBuf,
    pub quiescence_window: Duration,
    pub poll_interval: Duration,
    pub ancestor_segment: String,
    pub leaf_name: String,
    pub ready_marker: Option<String>,
    pub detection: DetectionMode,
    pub eviction: EvictionPolicy,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            quiescence_window: Duration::from_secs(10),
            poll_interval: Duration::from_secs(2),
            ancestor_segment: default_ancestor_segment(),
            leaf_name: default_leaf_name(),
            ready_marker: None,
            detection: DetectionMode::default(),
            eviction: EvictionPolicy::default(),
        }
    }
}

/// Complete set of registry settings needed to log in and push.
#[derive(Clone, PartialEq, Eq)]
pub struct RegistryCredentials {
    pub url: String,
    pub namespace: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for RegistryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryCredentials")
            .field("url", &self.url)
            .field("namespace", &self.namespace)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
