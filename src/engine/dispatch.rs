// src/engine/dispatch.rs

//! Single-fire trigger dispatch.
//!
//! The dispatcher owns the claim step and the spawned publish actions. Each
//! action runs in its own task, so a slow or failing build for one candidate
//! never holds up detection or firing for another.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::candidate::Candidate;
use crate::engine::EngineEvent;
use crate::publish::Publisher;

/// Counters over the dispatcher's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub fired: u64,
    pub succeeded: u64,
    pub failed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    fired: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

/// Claims stable candidates and runs the publish action for each winner.
#[derive(Debug)]
pub struct TriggerDispatcher {
    publisher: Publisher,
    events: Option<mpsc::Sender<EngineEvent>>,
    in_flight: Mutex<Vec<JoinHandle<()>>>,
    closed: AtomicBool,
    counters: Arc<Counters>,
}

impl TriggerDispatcher {
    pub fn new(publisher: Publisher) -> Self {
        Self {
            publisher,
            events: None,
            in_flight: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Report every outcome back to the runtime as
    /// [`EngineEvent::CandidateResolved`].
    pub fn with_events(mut self, events: mpsc::Sender<EngineEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Claim `candidate` and, if this call won the claim, spawn its publish
    /// action. Returns whether an action was started.
    ///
    /// Safe to call any number of times from any number of tasks: the claim
    /// is atomic, so at most one call per candidate ever returns `true`.
    pub fn dispatch(&self, candidate: Arc<Candidate>) -> bool {
        // The closed flag is checked and the handle stored under the same
        // lock as `close`, so nothing slips in behind a drain.
        let mut in_flight = self.in_flight();
        if self.closed.load(Ordering::Acquire) {
            debug!(
                path = %candidate.path().display(),
                "dispatcher closed; not firing"
            );
            return false;
        }

        if !candidate.claim() {
            debug!(
                path = %candidate.path().display(),
                state = %candidate.state(),
                "lost claim; candidate already fired"
            );
            return false;
        }

        self.counters.fired.fetch_add(1, Ordering::Relaxed);
        info!(path = %candidate.path().display(), "candidate claimed; firing publish action");

        let publisher = self.publisher.clone();
        let events = self.events.clone();
        let counters = Arc::clone(&self.counters);
        let handle = tokio::spawn(run_action(candidate, publisher, events, counters));

        in_flight.retain(|h| !h.is_finished());
        in_flight.push(handle);
        true
    }

    /// Stop accepting new firings. Actions already started keep running.
    pub fn close(&self) {
        let _in_flight = self.in_flight();
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Number of actions that have not finished yet.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight().iter().filter(|h| !h.is_finished()).count()
    }

    /// Wait for every started action to finish.
    pub async fn drain(&self) {
        loop {
            let handles = std::mem::take(&mut *self.in_flight());
            if handles.is_empty() {
                return;
            }
            debug!(count = handles.len(), "waiting for in-flight publish actions");
            for handle in handles {
                if let Err(e) = handle.await {
                    warn!(error = %e, "publish task ended abnormally");
                }
            }
        }
    }

    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            fired: self.counters.fired.load(Ordering::Relaxed),
            succeeded: self.counters.succeeded.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }

    fn in_flight(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Run the publish action for one claimed candidate and record the outcome.
async fn run_action(
    candidate: Arc<Candidate>,
    publisher: Publisher,
    events: Option<mpsc::Sender<EngineEvent>>,
    counters: Arc<Counters>,
) {
    let path = candidate.path().to_path_buf();

    // Nested spawn so a panicking collaborator still resolves the candidate.
    let action_path = path.clone();
    let action = tokio::spawn(async move { publisher.publish(&action_path).await });

    let outcome = match action.await {
        Ok(Ok(image)) => {
            info!(path = %path.display(), image = %image, "publish action succeeded");
            counters.succeeded.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
        Ok(Err(e)) => {
            error!(path = %path.display(), error = %e, "publish action failed");
            counters.failed.fetch_add(1, Ordering::Relaxed);
            Err(e.to_string())
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "publish action panicked");
            counters.failed.fetch_add(1, Ordering::Relaxed);
            Err(format!("publish action panicked: {e}"))
        }
    };

    candidate.resolve(outcome);

    if let Some(tx) = events {
        let event = EngineEvent::CandidateResolved {
            path,
            state: candidate.state(),
        };
        if let Err(e) = tx.send(event).await {
            debug!(error = %e, "runtime gone; dropping resolution event");
        }
    }
}
