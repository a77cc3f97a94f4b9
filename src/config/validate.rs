// src/config/validate.rs

use std::time::Duration;

use tracing::warn;

use crate::config::model::{
    AppConfig, RawConfigFile, RegistryCredentials, RegistrySection, WatcherConfig, WatcherSection,
};
use crate::errors::{ModelwatchError, Result};
use crate::types::parse_duration;

/// Below this window/poll ratio the extra detection latency becomes a large
/// fraction of the window itself.
pub const RECOMMENDED_POLL_RATIO: u32 = 5;

impl TryFrom<RawConfigFile> for AppConfig {
    type Error = ModelwatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let watcher = validate_watcher(raw.watcher)?;
        Ok(AppConfig {
            watcher,
            registry: raw.registry,
        })
    }
}

fn validate_watcher(section: WatcherSection) -> Result<WatcherConfig> {
    let quiescence_window = parse_field("quiescence_window", &section.quiescence_window)?;
    let poll_interval = parse_field("poll_interval", &section.poll_interval)?;

    validate_timing(quiescence_window, poll_interval)?;
    validate_segment("ancestor_segment", &section.ancestor_segment)?;
    validate_segment("leaf_name", &section.leaf_name)?;

    let ready_marker = match section.ready_marker {
        Some(marker) if marker.trim().is_empty() => None,
        Some(marker) => {
            validate_segment("ready_marker", &marker)?;
            Some(marker)
        }
        None => None,
    };

    Ok(WatcherConfig {
        root: section.root,
        quiescence_window,
        poll_interval,
        ancestor_segment: section.ancestor_segment,
        leaf_name: section.leaf_name,
        ready_marker,
        detection: section.detection,
        eviction: section.eviction,
    })
}

fn parse_field(name: &str, value: &str) -> Result<Duration> {
    parse_duration(value)
        .map_err(|e| ModelwatchError::ConfigError(format!("[watcher].{name}: {e}")))
}

fn validate_timing(window: Duration, poll: Duration) -> Result<()> {
    if poll.is_zero() {
        return Err(ModelwatchError::ConfigError(
            "[watcher].poll_interval must be greater than zero".to_string(),
        ));
    }

    if poll >= window {
        return Err(ModelwatchError::ConfigError(format!(
            "[watcher].poll_interval ({poll:?}) must be smaller than quiescence_window ({window:?})"
        )));
    }

    let coarse = poll
        .checked_mul(RECOMMENDED_POLL_RATIO)
        .is_none_or(|recommended| window < recommended);
    if coarse {
        warn!(
            ?window,
            ?poll,
            "quiescence window is less than {}x the poll interval; detection latency will be coarse",
            RECOMMENDED_POLL_RATIO
        );
    }

    Ok(())
}

/// A single path component: non-empty and free of separators.
fn validate_segment(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ModelwatchError::ConfigError(format!(
            "[watcher].{name} must not be empty"
        )));
    }
    if value.contains('/') || value.contains('\\') {
        return Err(ModelwatchError::ConfigError(format!(
            "[watcher].{name} must be a single path component (got '{value}')"
        )));
    }
    if value == "." || value == ".." {
        return Err(ModelwatchError::ConfigError(format!(
            "[watcher].{name} must name a real folder (got '{value}')"
        )));
    }
    Ok(())
}

impl RegistrySection {
    /// Resolve the full credential set, failing if any piece is missing.
    ///
    /// Only called when the process is about to publish; `--dry-run` never
    /// needs credentials.
    pub fn credentials(&self) -> Result<RegistryCredentials> {
        let require = |name: &str, value: &Option<String>| -> Result<String> {
            match value {
                Some(v) if !v.trim().is_empty() => Ok(v.clone()),
                _ => Err(ModelwatchError::ConfigError(format!(
                    "[registry].{name} is required to publish (set it in the config file or REGISTRY_{})",
                    name.to_uppercase()
                ))),
            }
        };

        if self.url.trim().is_empty() {
            return Err(ModelwatchError::ConfigError(
                "[registry].url must not be empty".to_string(),
            ));
        }

        Ok(RegistryCredentials {
            url: self.url.clone(),
            namespace: require("namespace", &self.namespace)?,
            username: require("username", &self.username)?,
            password: require("password", &self.password)?,
        })
    }
}
