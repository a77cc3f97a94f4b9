// src/candidate/record.rs

//! Per-candidate mutable state.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tokio::sync::futures::Notified;
use tokio::time::Instant;
use tracing::trace;

/// Lifecycle of a candidate.
///
/// `Pending → Claimed → Triggered | Failed`. `Claimed` is the transient marker
/// held while the publish action runs; `Triggered` and `Failed` are terminal.
/// Nothing ever moves back to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CandidateState {
    Pending = 0,
    Claimed = 1,
    Triggered = 2,
    Failed = 3,
}

impl CandidateState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => CandidateState::Pending,
            1 => CandidateState::Claimed,
            2 => CandidateState::Triggered,
            _ => CandidateState::Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, CandidateState::Triggered | CandidateState::Failed)
    }
}

impl fmt::Display for CandidateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CandidateState::Pending => "pending",
            CandidateState::Claimed => "claimed",
            CandidateState::Triggered => "triggered",
            CandidateState::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy)]
struct Activity {
    last_modified_at: Instant,
    modification_count: u64,
}

/// One artifact folder under observation.
///
/// Identity is the path. Timestamps and the counter live behind a small
/// per-candidate mutex; the lifecycle state is an atomic so readers never
/// block. Transitions out of `Pending` are taken while holding the activity
/// lock, which keeps "record a write" and "claim" mutually ordered.
pub struct Candidate {
    path: PathBuf,
    discovered_at: Instant,
    state: AtomicU8,
    activity: Mutex<Activity>,
    failure: Mutex<Option<String>>,
    activity_signal: Notify,
}

impl fmt::Debug for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let activity = *self.activity();
        f.debug_struct("Candidate")
            .field("path", &self.path)
            .field("state", &self.state())
            .field("modification_count", &activity.modification_count)
            .finish_non_exhaustive()
    }
}

impl Candidate {
    pub fn new(path: impl Into<PathBuf>, discovered_at: Instant) -> Self {
        Self {
            path: path.into(),
            discovered_at,
            state: AtomicU8::new(CandidateState::Pending as u8),
            activity: Mutex::new(Activity {
                last_modified_at: discovered_at,
                modification_count: 0,
            }),
            failure: Mutex::new(None),
            activity_signal: Notify::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn discovered_at(&self) -> Instant {
        self.discovered_at
    }

    pub fn state(&self) -> CandidateState {
        CandidateState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn last_modified_at(&self) -> Instant {
        self.activity().last_modified_at
    }

    pub fn modification_count(&self) -> u64 {
        self.activity().modification_count
    }

    /// Error message recorded when the candidate ended up `Failed`.
    pub fn failure(&self) -> Option<String> {
        self.failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Record a write below this candidate.
    ///
    /// Returns `false` (and changes nothing) unless the candidate is still
    /// `Pending`. Events may arrive out of order, so `last_modified_at` only
    /// ever moves forward.
    pub fn record_modification(&self, now: Instant) -> bool {
        let mut activity = self.activity();
        if self.state() != CandidateState::Pending {
            return false;
        }

        activity.modification_count += 1;
        if now > activity.last_modified_at {
            activity.last_modified_at = now;
        }
        trace!(
            path = %self.path.display(),
            count = activity.modification_count,
            "recorded modification"
        );
        drop(activity);

        self.activity_signal.notify_one();
        true
    }

    /// Atomically move `Pending → Claimed`.
    ///
    /// This is the single linearization point for firing: of any number of
    /// concurrent callers, exactly one observes `true`.
    pub fn claim(&self) -> bool {
        let _activity = self.activity();
        self.state
            .compare_exchange(
                CandidateState::Pending as u8,
                CandidateState::Claimed as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Record the outcome of a claimed candidate's action.
    ///
    /// `Ok` → `Triggered`, `Err(msg)` → `Failed` with the message kept.
    /// Returns `false` if the candidate was not `Claimed`.
    pub fn resolve(&self, outcome: Result<(), String>) -> bool {
        let mut failure = self.failure.lock().unwrap_or_else(PoisonError::into_inner);
        let (target, message) = match outcome {
            Ok(()) => (CandidateState::Triggered, None),
            Err(message) => (CandidateState::Failed, Some(message)),
        };

        let moved = self
            .state
            .compare_exchange(
                CandidateState::Claimed as u8,
                target as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        if moved {
            *failure = message;
        }
        drop(failure);

        // Wake any tracker still waiting on activity so it can observe the
        // terminal state and exit.
        self.activity_signal.notify_one();
        moved
    }

    /// Future that completes after the next recorded modification (or
    /// resolution). A wake-up that happened while nobody was waiting is kept,
    /// so callers may see one spurious wake.
    pub fn activity_changed(&self) -> Notified<'_> {
        self.activity_signal.notified()
    }

    pub fn snapshot(&self) -> CandidateSnapshot {
        let activity = *self.activity();
        CandidateSnapshot {
            path: self.path.clone(),
            state: self.state(),
            discovered_at: self.discovered_at,
            last_modified_at: activity.last_modified_at,
            modification_count: activity.modification_count,
            failure: self.failure(),
        }
    }

    fn activity(&self) -> MutexGuard<'_, Activity> {
        self.activity.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Point-in-time copy of a candidate, for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSnapshot {
    pub path: PathBuf,
    pub state: CandidateState,
    pub discovered_at: Instant,
    pub last_modified_at: Instant,
    pub modification_count: u64,
    pub failure: Option<String>,
}
