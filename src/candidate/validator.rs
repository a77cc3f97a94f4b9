// src/candidate/validator.rs

//! Path predicate deciding which created directories become candidates.

use std::ffi::OsStr;
use std::path::{Component, Path};

use crate::config::WatcherConfig;

/// Pure predicate over a directory path.
///
/// A path qualifies iff its last component equals `leaf_name` and
/// `ancestor_segment` appears among its components. Only the path string is
/// inspected; the filesystem is never touched, so the answer cannot race with
/// the event being validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateValidator {
    ancestor_segment: String,
    leaf_name: String,
}

impl CandidateValidator {
    pub fn new(ancestor_segment: impl Into<String>, leaf_name: impl Into<String>) -> Self {
        Self {
            ancestor_segment: ancestor_segment.into(),
            leaf_name: leaf_name.into(),
        }
    }

    pub fn from_config(cfg: &WatcherConfig) -> Self {
        Self::new(cfg.ancestor_segment.clone(), cfg.leaf_name.clone())
    }

    pub fn is_candidate(&self, path: &Path) -> bool {
        if path.file_name() != Some(OsStr::new(&self.leaf_name)) {
            return false;
        }

        path.components().any(|c| match c {
            Component::Normal(name) => name == OsStr::new(&self.ancestor_segment),
            _ => false,
        })
    }

    pub fn leaf_name(&self) -> &str {
        &self.leaf_name
    }

    pub fn ancestor_segment(&self) -> &str {
        &self.ancestor_segment
    }
}

impl Default for CandidateValidator {
    fn default() -> Self {
        Self::from_config(&WatcherConfig::default())
    }
}
