// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous "core runtime" that consumes
//! [`EngineEvent`]s and produces:
//! - updates to the candidate table
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels
//! - spawning stability trackers
//! - handling Ctrl+C / shutdown
//!
//! Time is passed in explicitly, so the core can be unit tested without
//! Tokio, channels, the filesystem, or processes.

use std::sync::Arc;

use tokio::time::Instant;
use tracing::{info, warn};

use crate::candidate::{CandidateTable, CandidateValidator};
use crate::config::WatcherConfig;
use crate::engine::event_handlers::{
    handle_directory_created, handle_path_modified, handle_resolution, CoreStep,
};
use crate::engine::EngineEvent;
use crate::types::EvictionPolicy;

/// Pure core runtime state.
///
/// This owns:
/// - the candidate validator
/// - a handle to the shared candidate table
/// - the eviction policy
#[derive(Debug)]
pub struct CoreRuntime {
    validator: CandidateValidator,
    table: Arc<CandidateTable>,
    eviction: EvictionPolicy,
}

impl CoreRuntime {
    pub fn new(
        validator: CandidateValidator,
        table: Arc<CandidateTable>,
        eviction: EvictionPolicy,
    ) -> Self {
        Self {
            validator,
            table,
            eviction,
        }
    }

    pub fn from_config(cfg: &WatcherConfig, table: Arc<CandidateTable>) -> Self {
        Self::new(CandidateValidator::from_config(cfg), table, cfg.eviction)
    }

    pub fn table(&self) -> &Arc<CandidateTable> {
        &self.table
    }

    /// Handle a single engine event, updating candidate state and returning
    /// the resulting commands for the IO shell.
    pub fn step(&mut self, event: EngineEvent, now: Instant) -> CoreStep {
        match event {
            EngineEvent::DirectoryCreated { path } => {
                handle_directory_created(&self.validator, &self.table, &path, now)
            }
            EngineEvent::PathModified { path } => handle_path_modified(&self.table, &path, now),
            EngineEvent::CandidateResolved { path, state } => {
                handle_resolution(&self.table, self.eviction, &path, state)
            }
            EngineEvent::ObserverFault { message } => {
                warn!(error = %message, "file watch error; continuing to observe");
                CoreStep::continue_with(Vec::new())
            }
            EngineEvent::ShutdownRequested => {
                info!("shutdown requested");
                CoreStep {
                    commands: Vec::new(),
                    keep_running: false,
                }
            }
        }
    }
}
