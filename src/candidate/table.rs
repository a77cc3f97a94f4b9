// src/candidate/table.rs

//! Shared path → candidate map.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::time::Instant;

use crate::candidate::record::{Candidate, CandidateSnapshot, CandidateState};

/// Result of [`CandidateTable::register`].
#[derive(Debug, Clone)]
pub enum Registration {
    /// First sighting of this path; a fresh `Pending` record was created.
    New(Arc<Candidate>),
    /// The path is already tracked. Its state and timers were left untouched.
    Existing(Arc<Candidate>),
}

impl Registration {
    pub fn candidate(&self) -> &Arc<Candidate> {
        match self {
            Registration::New(c) | Registration::Existing(c) => c,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Registration::New(_))
    }
}

/// Counts of candidates per state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateSummary {
    pub pending: usize,
    pub claimed: usize,
    pub triggered: usize,
    pub failed: usize,
}

/// The only shared mutable structure in the engine.
///
/// The map lock is held just long enough to look up or insert an `Arc`; all
/// per-candidate mutation happens on the `Candidate` itself, so work on
/// different candidates never serialises behind the table.
#[derive(Debug, Default)]
pub struct CandidateTable {
    entries: RwLock<HashMap<PathBuf, Arc<Candidate>>>,
}

impl CandidateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent registration. An existing record is returned as-is so a
    /// folder re-created after it fired can never fire again.
    pub fn register(&self, path: &Path, now: Instant) -> Registration {
        if let Some(existing) = self.read().get(path) {
            return Registration::Existing(Arc::clone(existing));
        }

        let mut entries = self.write();
        if let Some(existing) = entries.get(path) {
            return Registration::Existing(Arc::clone(existing));
        }
        let candidate = Arc::new(Candidate::new(path, now));
        entries.insert(path.to_path_buf(), Arc::clone(&candidate));
        Registration::New(candidate)
    }

    pub fn get(&self, path: &Path) -> Option<Arc<Candidate>> {
        self.read().get(path).cloned()
    }

    /// Nearest tracked candidate strictly above `path`.
    ///
    /// With nested candidates (`.../model/sub/model/file`) the innermost one
    /// owns the event.
    pub fn owner_of(&self, path: &Path) -> Option<Arc<Candidate>> {
        let entries = self.read();
        if entries.is_empty() {
            return None;
        }
        path.ancestors()
            .skip(1)
            .find_map(|ancestor| entries.get(ancestor).cloned())
    }

    /// Drop a record. Only the eviction policy calls this.
    pub fn evict(&self, path: &Path) -> Option<Arc<Candidate>> {
        self.write().remove(path)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Snapshots of every record, sorted by path.
    pub fn snapshot(&self) -> Vec<CandidateSnapshot> {
        let candidates: Vec<Arc<Candidate>> = self.read().values().cloned().collect();
        let mut snaps: Vec<CandidateSnapshot> = candidates.iter().map(|c| c.snapshot()).collect();
        snaps.sort_by(|a, b| a.path.cmp(&b.path));
        snaps
    }

    pub fn summary(&self) -> StateSummary {
        let mut summary = StateSummary::default();
        for candidate in self.read().values() {
            match candidate.state() {
                CandidateState::Pending => summary.pending += 1,
                CandidateState::Claimed => summary.claimed += 1,
                CandidateState::Triggered => summary.triggered += 1,
                CandidateState::Failed => summary.failed += 1,
            }
        }
        summary
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<PathBuf, Arc<Candidate>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<PathBuf, Arc<Candidate>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}
