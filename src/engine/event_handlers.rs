// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use std::path::Path;
use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, info, trace};

use crate::candidate::{Candidate, CandidateState, CandidateTable, CandidateValidator, Registration};
use crate::types::EvictionPolicy;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Start an independent stability tracker for this new candidate.
    TrackCandidate(Arc<Candidate>),
}

/// Decision returned by the core after handling a single `EngineEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    pub fn continue_with(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

/// Handle a directory creation.
///
/// - A new directory below a `Pending` candidate is activity for that
///   candidate.
/// - A qualifying directory is registered. Registration is idempotent: a path
///   that is already tracked keeps its state and timers, so a folder
///   re-created after it fired can never fire again.
pub fn handle_directory_created(
    validator: &CandidateValidator,
    table: &CandidateTable,
    path: &Path,
    now: Instant,
) -> CoreStep {
    if let Some(owner) = table.owner_of(path) {
        if owner.record_modification(now) {
            trace!(
                candidate = %owner.path().display(),
                dir = %path.display(),
                "subdirectory created inside candidate"
            );
        }
    }

    if !validator.is_candidate(path) {
        trace!(path = %path.display(), "directory is not a candidate");
        return CoreStep::continue_with(Vec::new());
    }

    match table.register(path, now) {
        Registration::New(candidate) => {
            info!(path = %path.display(), "discovered candidate folder");
            CoreStep::continue_with(vec![CoreCommand::TrackCandidate(candidate)])
        }
        Registration::Existing(candidate) => {
            debug!(
                path = %path.display(),
                state = %candidate.state(),
                "candidate already tracked; ignoring re-creation"
            );
            CoreStep::continue_with(Vec::new())
        }
    }
}

/// Handle a write somewhere under the root.
///
/// Only the nearest tracked ancestor is touched, and only while it is still
/// `Pending`; writes to resolved candidates are dropped.
pub fn handle_path_modified(table: &CandidateTable, path: &Path, now: Instant) -> CoreStep {
    if let Some(owner) = table.owner_of(path) {
        if !owner.record_modification(now) {
            trace!(
                candidate = %owner.path().display(),
                state = %owner.state(),
                "ignoring write to resolved candidate"
            );
        }
    }
    CoreStep::continue_with(Vec::new())
}

/// Handle the outcome of a publish action.
pub fn handle_resolution(
    table: &CandidateTable,
    eviction: EvictionPolicy,
    path: &Path,
    state: CandidateState,
) -> CoreStep {
    debug!(path = %path.display(), %state, "candidate resolved");

    if eviction == EvictionPolicy::AfterResolution && state.is_terminal() {
        if table.evict(path).is_some() {
            debug!(path = %path.display(), "evicted resolved candidate");
        }
    }

    CoreStep::continue_with(Vec::new())
}
