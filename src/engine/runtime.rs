// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::candidate::{Candidate, CandidateState, CandidateTable, StateSummary};
use crate::config::WatcherConfig;
use crate::errors::{ModelwatchError, Result};
use crate::fs::FileSystem;
use crate::publish::Publisher;

use super::core::CoreRuntime;
use super::dispatch::{DispatchStats, TriggerDispatcher};
use super::stability::{StabilitySettings, StabilityTracker};
use super::{CoreCommand, EngineEvent};

/// Capacity of the runtime event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// What the runtime did, reported when it exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Candidates still in the table at exit, by state.
    pub states: StateSummary,
    /// Firings over the whole run, including evicted candidates.
    pub dispatch: DispatchStats,
}

/// Cheap handle for feeding the runtime and inspecting its table.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    events: mpsc::Sender<EngineEvent>,
    table: Arc<CandidateTable>,
}

impl EngineHandle {
    /// Sender for watcher events, signal handlers and tests.
    pub fn sender(&self) -> mpsc::Sender<EngineEvent> {
        self.events.clone()
    }

    pub async fn send(&self, event: EngineEvent) -> Result<()> {
        self.events
            .send(event)
            .await
            .map_err(|e| ModelwatchError::Other(anyhow::anyhow!("runtime event channel closed: {e}")))
    }

    /// Ask the runtime to stop. A runtime that already exited is not an error.
    pub async fn shutdown(&self) {
        let _ = self.events.send(EngineEvent::ShutdownRequested).await;
    }

    pub fn table(&self) -> &Arc<CandidateTable> {
        &self.table
    }
}

/// Async shell around [`CoreRuntime`].
///
/// Reads [`EngineEvent`]s, feeds them to the core and executes the commands
/// it returns: one [`StabilityTracker`] task per new candidate. Publish
/// actions are owned by the [`TriggerDispatcher`].
pub struct Runtime {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<EngineEvent>,
    tracker: Arc<StabilityTracker>,
    dispatcher: Arc<TriggerDispatcher>,
    shutdown_tx: watch::Sender<bool>,
    trackers: JoinSet<()>,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("trackers", &self.trackers.len())
            .finish_non_exhaustive()
    }
}

impl Runtime {
    /// Wire up a runtime from config, returning it together with a handle.
    pub fn build(
        cfg: &WatcherConfig,
        fs: Arc<dyn FileSystem>,
        publisher: Publisher,
    ) -> (Self, EngineHandle) {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let table = Arc::new(CandidateTable::new());

        let dispatcher = Arc::new(TriggerDispatcher::new(publisher).with_events(event_tx.clone()));
        let tracker = Arc::new(StabilityTracker::new(
            StabilitySettings::from_config(cfg),
            fs,
            Arc::clone(&dispatcher),
        ));
        let (shutdown_tx, _) = watch::channel(false);

        let runtime = Self {
            core: CoreRuntime::from_config(cfg, Arc::clone(&table)),
            event_rx,
            tracker,
            dispatcher,
            shutdown_tx,
            trackers: JoinSet::new(),
        };
        let handle = EngineHandle {
            events: event_tx,
            table,
        };
        (runtime, handle)
    }

    pub fn dispatcher(&self) -> &Arc<TriggerDispatcher> {
        &self.dispatcher
    }

    /// Main event loop. Returns after [`EngineEvent::ShutdownRequested`]
    /// once every started publish action has finished.
    pub async fn run(mut self) -> Result<RunSummary> {
        info!("modelwatch runtime started");

        loop {
            tokio::select! {
                maybe_event = self.event_rx.recv() => {
                    let Some(event) = maybe_event else {
                        info!("runtime event channel closed; exiting");
                        break;
                    };
                    debug!(?event, "runtime received event");

                    let step = self.core.step(event, Instant::now());
                    for command in step.commands {
                        self.execute_command(command);
                    }

                    if !step.keep_running {
                        break;
                    }
                }
                Some(joined) = self.trackers.join_next(), if !self.trackers.is_empty() => {
                    if let Err(e) = joined {
                        warn!(error = %e, "stability tracker ended abnormally");
                    }
                }
            }
        }

        self.shut_down().await;

        for snap in self.core.table().snapshot() {
            if snap.state == CandidateState::Pending {
                info!(
                    path = %snap.path.display(),
                    writes = snap.modification_count,
                    "candidate still pending at exit"
                );
            }
        }

        let summary = RunSummary {
            states: self.core.table().summary(),
            dispatch: self.dispatcher.stats(),
        };
        info!(
            pending = summary.states.pending,
            triggered = summary.states.triggered,
            failed = summary.states.failed,
            fired = summary.dispatch.fired,
            "runtime exiting"
        );
        Ok(summary)
    }

    fn execute_command(&mut self, command: CoreCommand) {
        match command {
            CoreCommand::TrackCandidate(candidate) => self.spawn_tracker(candidate),
        }
    }

    fn spawn_tracker(&mut self, candidate: Arc<Candidate>) {
        let tracker = Arc::clone(&self.tracker);
        let shutdown = self.shutdown_tx.subscribe();
        self.trackers
            .spawn(async move { tracker.track(candidate, shutdown).await });
    }

    /// Stop trackers, refuse new firings, and wait for in-flight actions.
    ///
    /// Events are still consumed while waiting so actions reporting their
    /// outcome never block on a full channel, and late resolutions still go
    /// through the core.
    async fn shut_down(&mut self) {
        self.shutdown_tx.send_replace(true);
        self.dispatcher.close();

        while let Some(joined) = self.trackers.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "stability tracker ended abnormally");
            }
        }

        let in_flight = self.dispatcher.in_flight_count();
        if in_flight > 0 {
            info!(in_flight, "waiting for in-flight publish actions");
        }

        let dispatcher = Arc::clone(&self.dispatcher);
        let drain = dispatcher.drain();
        tokio::pin!(drain);
        loop {
            tokio::select! {
                _ = &mut drain => break,
                Some(event) = self.event_rx.recv() => self.apply_late(event),
            }
        }

        while let Ok(event) = self.event_rx.try_recv() {
            self.apply_late(event);
        }
    }

    /// Handle an event after shutdown began. Only outcomes matter now.
    fn apply_late(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::CandidateResolved { .. } => {
                self.core.step(event, Instant::now());
            }
            other => debug!(event = ?other, "ignoring event during shutdown"),
        }
    }
}
