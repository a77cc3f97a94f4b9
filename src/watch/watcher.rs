// src/watch/watcher.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::engine::EngineEvent;
use crate::errors::{ModelwatchError, Result};
use crate::fs::FileSystem;
use crate::watch::event_handler::classify_event;
use crate::watch::path_utils::{subdirectories, MAX_DISCOVERY_DEPTH};

/// Handle for the filesystem watcher.
///
/// Keeps the underlying `RecommendedWatcher` alive. Dropping this handle
/// stops file watching; the forwarding task then drains and exits.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
    root: PathBuf,
    forwarder: JoinHandle<()>,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl WatcherHandle {
    /// The root being observed, as it was configured.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stop watching and wait for the forwarding task to finish.
    pub async fn stop(self) {
        let WatcherHandle {
            _inner, forwarder, ..
        } = self;
        drop(_inner);
        if let Err(e) = forwarder.await {
            warn!(error = %e, "watcher forwarding task ended abnormally");
        }
    }
}

/// Observe `root` recursively and forward classified events to the runtime.
///
/// Errors reported by the notification backend become
/// [`EngineEvent::ObserverFault`]; watching continues after them.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    fs: Arc<dyn FileSystem>,
    runtime_tx: mpsc::Sender<EngineEvent>,
) -> Result<WatcherHandle> {
    let root = root.into();
    if !root.is_dir() {
        return Err(ModelwatchError::ConfigError(format!(
            "watch root {} is not a directory",
            root.display()
        )));
    }
    // Not canonicalized: event paths must keep the configured prefix, which
    // may be the only place the ancestor segment appears.
    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            // The receiver only goes away on shutdown.
            let _ = event_tx.send(res);
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;

    info!(root = %root.display(), "file watcher started");

    let forwarder = tokio::spawn(async move {
        while let Some(res) = event_rx.recv().await {
            for event in translate(res, Arc::clone(&fs)).await {
                if runtime_tx.send(event).await.is_err() {
                    debug!("runtime event channel closed; stopping watcher loop");
                    return;
                }
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle {
        _inner: watcher,
        root,
        forwarder,
    })
}

/// Engine events for one result delivered by the notification backend.
async fn translate(res: notify::Result<Event>, fs: Arc<dyn FileSystem>) -> Vec<EngineEvent> {
    match res {
        Ok(event) => {
            trace!(?event, "received notify event");
            expand(event, fs).await
        }
        Err(err) => {
            debug!(error = %err, "file watcher backend reported an error");
            vec![EngineEvent::ObserverFault {
                message: err.to_string(),
            }]
        }
    }
}

/// Classify `event` and, for every new directory, add creation events for
/// the subdirectories it already contains.
async fn expand(event: Event, fs: Arc<dyn FileSystem>) -> Vec<EngineEvent> {
    let classified = classify_event(&event, fs.as_ref());
    if !classified
        .iter()
        .any(|e| matches!(e, EngineEvent::DirectoryCreated { .. }))
    {
        return classified;
    }

    let scan = tokio::task::spawn_blocking(move || discover(classified, fs.as_ref())).await;
    match scan {
        Ok(events) => events,
        Err(e) => {
            warn!(error = %e, "directory discovery scan failed");
            Vec::new()
        }
    }
}

fn discover(classified: Vec<EngineEvent>, fs: &dyn FileSystem) -> Vec<EngineEvent> {
    let mut out = Vec::with_capacity(classified.len());
    for event in classified {
        let nested = match &event {
            EngineEvent::DirectoryCreated { path } => subdirectories(fs, path, MAX_DISCOVERY_DEPTH),
            _ => Vec::new(),
        };
        out.push(event);
        if !nested.is_empty() {
            debug!(count = nested.len(), "found directories inside new directory");
        }
        out.extend(
            nested
                .into_iter()
                .map(|path| EngineEvent::DirectoryCreated { path }),
        );
    }
    out
}
