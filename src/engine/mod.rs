// src/engine/mod.rs

//! Stability detection and single-fire trigger engine.
//!
//! This module ties together:
//! - the candidate table (one record per qualifying folder),
//! - a per-candidate stability tracker that waits for quiescence,
//! - the trigger dispatcher that claims a candidate and runs the publish
//!   action at most once,
//! - the main runtime event loop that reacts to:
//!   - directory creations and file writes from the watcher
//!   - publish outcomes
//!   - observer faults
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::path::PathBuf;

use crate::candidate::CandidateState;

/// Events flowing into the runtime from the watcher, dispatcher, etc.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A directory appeared under the root.
    DirectoryCreated { path: PathBuf },
    /// A non-directory path was written (created, modified, renamed into place).
    PathModified { path: PathBuf },
    /// The publish action for a candidate finished.
    CandidateResolved { path: PathBuf, state: CandidateState },
    /// The notification source reported an internal error.
    ObserverFault { message: String },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod dispatch;
pub mod event_handlers;
pub mod runtime;
pub mod stability;

pub use core::CoreRuntime;
pub use dispatch::{DispatchStats, TriggerDispatcher};
pub use event_handlers::{CoreCommand, CoreStep};
pub use runtime::{EngineHandle, RunSummary, Runtime, EVENT_CHANNEL_CAPACITY};
pub use stability::{evaluate, StabilitySettings, StabilityTracker, Verdict};
