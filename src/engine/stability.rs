// src/engine/stability.rs

//! Quiescence detection for a single candidate.
//!
//! A candidate is stable once no write has been recorded for at least the
//! quiescence window and, if configured, its ready marker exists. There is no
//! definitive "write complete" signal from the producer, so a long enough
//! silence is taken as evidence of completion. A producer that pauses longer
//! than the window mid-write will be fired early; the ready marker narrows
//! that window but cannot close it.
//!
//! Checks repeat until the candidate stabilizes or the process stops. A
//! candidate that never goes quiet is watched forever.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{sleep, Instant};
use tracing::{debug, trace};

use crate::candidate::{Candidate, CandidateState};
use crate::config::WatcherConfig;
use crate::engine::dispatch::TriggerDispatcher;
use crate::fs::FileSystem;
use crate::types::DetectionMode;

/// The subset of [`WatcherConfig`] a tracker needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StabilitySettings {
    pub quiescence_window: Duration,
    pub poll_interval: Duration,
    pub ready_marker: Option<String>,
    pub detection: DetectionMode,
}

impl StabilitySettings {
    pub fn from_config(cfg: &WatcherConfig) -> Self {
        Self {
            quiescence_window: cfg.quiescence_window,
            poll_interval: cfg.poll_interval,
            ready_marker: cfg.ready_marker.clone(),
            detection: cfg.detection,
        }
    }
}

/// Result of one stability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The candidate already left `Pending`; stop tracking it.
    Resolved(CandidateState),
    /// Written to too recently. `remaining` is the idle time still needed.
    Unsettled { remaining: Duration },
    /// Idle long enough, but the ready marker is missing.
    AwaitingMarker,
    /// Stable: hand off to the dispatcher.
    Quiescent,
}

/// Evaluate the quiescence predicate for `candidate` at `now`.
pub fn evaluate(
    candidate: &Candidate,
    now: Instant,
    settings: &StabilitySettings,
    fs: &dyn FileSystem,
) -> Verdict {
    let state = candidate.state();
    if state != CandidateState::Pending {
        return Verdict::Resolved(state);
    }

    let idle = now.saturating_duration_since(candidate.last_modified_at());
    if idle < settings.quiescence_window {
        return Verdict::Unsettled {
            remaining: settings.quiescence_window - idle,
        };
    }

    if let Some(marker) = &settings.ready_marker {
        if !fs.exists(&candidate.path().join(marker)) {
            return Verdict::AwaitingMarker;
        }
    }

    Verdict::Quiescent
}

/// Runs the periodic check for each candidate it is handed.
#[derive(Debug)]
pub struct StabilityTracker {
    settings: StabilitySettings,
    fs: Arc<dyn FileSystem>,
    dispatcher: Arc<TriggerDispatcher>,
}

impl StabilityTracker {
    pub fn new(
        settings: StabilitySettings,
        fs: Arc<dyn FileSystem>,
        dispatcher: Arc<TriggerDispatcher>,
    ) -> Self {
        Self {
            settings,
            fs,
            dispatcher,
        }
    }

    pub fn settings(&self) -> &StabilitySettings {
        &self.settings
    }

    /// Track `candidate` until it fires, is resolved elsewhere, or `shutdown`
    /// flips to `true` (or its sender goes away).
    pub async fn track(&self, candidate: Arc<Candidate>, mut shutdown: watch::Receiver<bool>) {
        debug!(
            path = %candidate.path().display(),
            mode = ?self.settings.detection,
            "stability tracking started"
        );

        match self.settings.detection {
            DetectionMode::Poll => self.poll_loop(&candidate, &mut shutdown).await,
            DetectionMode::Deadline => self.deadline_loop(&candidate, &mut shutdown).await,
        }

        debug!(
            path = %candidate.path().display(),
            state = %candidate.state(),
            "stability tracking finished"
        );
    }

    /// Sleep `poll_interval`, check, repeat.
    async fn poll_loop(&self, candidate: &Arc<Candidate>, shutdown: &mut watch::Receiver<bool>) {
        loop {
            tokio::select! {
                _ = sleep(self.settings.poll_interval) => {}
                _ = shutdown.changed() => return,
            }
            if *shutdown.borrow() {
                return;
            }

            if self.check(candidate) {
                return;
            }
        }
    }

    /// Sleep until `last_modified_at + window`; any recorded write wakes the
    /// loop early so the deadline can be recomputed.
    async fn deadline_loop(
        &self,
        candidate: &Arc<Candidate>,
        shutdown: &mut watch::Receiver<bool>,
    ) {
        loop {
            if *shutdown.borrow() {
                return;
            }

            let wait = match evaluate(candidate, Instant::now(), &self.settings, self.fs.as_ref()) {
                Verdict::Unsettled { remaining } => remaining,
                // The marker may show up without a write we can see, so fall
                // back to polling for it.
                Verdict::AwaitingMarker => self.settings.poll_interval,
                Verdict::Resolved(_) | Verdict::Quiescent => {
                    if self.check(candidate) {
                        return;
                    }
                    continue;
                }
            };

            let activity = candidate.activity_changed();
            tokio::select! {
                _ = sleep(wait) => {}
                _ = activity => {
                    trace!(path = %candidate.path().display(), "activity; deadline pushed back");
                }
                _ = shutdown.changed() => return,
            }
        }
    }

    /// One check. Returns `true` once the tracker has nothing more to do.
    fn check(&self, candidate: &Arc<Candidate>) -> bool {
        let now = Instant::now();
        match evaluate(candidate, now, &self.settings, self.fs.as_ref()) {
            Verdict::Resolved(state) => {
                trace!(path = %candidate.path().display(), %state, "already resolved");
                true
            }
            Verdict::Unsettled { remaining } => {
                trace!(
                    path = %candidate.path().display(),
                    ?remaining,
                    "not yet quiescent"
                );
                false
            }
            Verdict::AwaitingMarker => {
                trace!(path = %candidate.path().display(), "quiescent but ready marker missing");
                false
            }
            Verdict::Quiescent => {
                debug!(
                    path = %candidate.path().display(),
                    writes = candidate.modification_count(),
                    "candidate is quiescent"
                );
                self.dispatcher.dispatch(Arc::clone(candidate));
                true
            }
        }
    }
}
