use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

/// How the stability check for a `Pending` candidate is scheduled.
///
/// - `Poll`: sleep `poll_interval` between checks (default). Detection latency
///   beyond true quiescence is bounded by one poll interval.
/// - `Deadline`: keep one deadline per candidate at `last_modified_at +
///   quiescence_window`, pushed back by every recorded modification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMode {
    Poll,
    Deadline,
}

impl Default for DetectionMode {
    fn default() -> Self {
        DetectionMode::Poll
    }
}

impl FromStr for DetectionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "poll" => Ok(DetectionMode::Poll),
            "deadline" => Ok(DetectionMode::Deadline),
            other => Err(format!(
                "invalid detection mode: {other} (expected \"poll\" or \"deadline\")"
            )),
        }
    }
}

/// What happens to a candidate record once its outcome is known.
///
/// `Never` keeps every record for the process lifetime, so a re-created folder
/// at an already-resolved path can never fire again. `AfterResolution` bounds
/// memory for long-running processes at the cost of that guarantee: a path
/// re-created after eviction is tracked as a brand new candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EvictionPolicy {
    Never,
    AfterResolution,
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        EvictionPolicy::Never
    }
}

impl FromStr for EvictionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "never" => Ok(EvictionPolicy::Never),
            "after-resolution" | "after_resolution" => Ok(EvictionPolicy::AfterResolution),
            other => Err(format!(
                "invalid eviction policy: {other} (expected \"never\" or \"after-resolution\")"
            )),
        }
    }
}

/// Parse a duration such as `"500ms"`, `"10s"`, `"2m"` or `"1h"`.
///
/// A bare integer is read as seconds, so `QUIESCENCE_WINDOW=30` works.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = match s.chars().position(|c| !c.is_ascii_digit()) {
        Some(0) => return Err(format!("duration '{s}' must start with a number")),
        Some(idx) => idx,
        None => {
            let secs: u64 = s
                .parse()
                .map_err(|e| format!("invalid duration number '{s}': {e}"))?;
            return Ok(Duration::from_secs(secs));
        }
    };

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let secs_per_unit = match unit.as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        _ => {
            return Err(format!(
                "unsupported duration unit '{}'; expected ms, s, m, or h",
                unit
            ))
        }
    };

    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{s}' is too large"))
}
