#![allow(dead_code)]

use std::path::PathBuf;
use std::time::Duration;

use tokio::time::{sleep_until, Instant};

use modelwatch::engine::{EngineEvent, EngineHandle};

/// Virtual-clock helper: every scenario step is expressed as seconds since
/// `start`, matching how the scenarios are written down.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    start: Instant,
}

impl Clock {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn at(&self, secs: f64) -> Instant {
        self.start + Duration::from_secs_f64(secs)
    }

    /// Sleep until `secs` after start. A no-op if that moment already passed.
    pub async fn advance_to(&self, secs: f64) {
        sleep_until(self.at(secs)).await;
    }

    pub fn elapsed(&self) -> Duration {
        Instant::now() - self.start
    }
}

pub fn dir_created(path: &str) -> EngineEvent {
    EngineEvent::DirectoryCreated {
        path: PathBuf::from(path),
    }
}

pub fn written(path: &str) -> EngineEvent {
    EngineEvent::PathModified {
        path: PathBuf::from(path),
    }
}

pub async fn send(handle: &EngineHandle, event: EngineEvent) {
    handle.send(event).await.expect("runtime is running");
}
