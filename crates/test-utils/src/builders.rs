#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use modelwatch::config::WatcherConfig;
use modelwatch::engine::{EngineHandle, Runtime};
use modelwatch::fs::FileSystem;
use modelwatch::publish::{Authenticator, Builder, Namer, Publisher};
use modelwatch::types::{DetectionMode, EvictionPolicy};

use crate::fakes::{FixedNamer, RecordingAuthenticator, RecordingBuilder};

/// Builder for `WatcherConfig` to simplify test setup.
///
/// Starts from the production defaults: root `/mlartifacts`, a 10s window
/// polled every 2s, no ready marker.
#[derive(Debug, Clone, Default)]
pub struct WatcherConfigBuilder {
    config: WatcherConfig,
}

impl WatcherConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.root = root.into();
        self
    }

    pub fn quiescence(mut self, window: Duration) -> Self {
        self.config.quiescence_window = window;
        self
    }

    pub fn poll_interval(mut self, poll: Duration) -> Self {
        self.config.poll_interval = poll;
        self
    }

    pub fn ready_marker(mut self, marker: &str) -> Self {
        self.config.ready_marker = Some(marker.to_string());
        self
    }

    pub fn detection(mut self, mode: DetectionMode) -> Self {
        self.config.detection = mode;
        self
    }

    pub fn eviction(mut self, policy: EvictionPolicy) -> Self {
        self.config.eviction = policy;
        self
    }

    pub fn build(self) -> WatcherConfig {
        self.config
    }
}

/// A runtime wired to fake collaborators, plus handles to inspect them.
pub struct TestEngine {
    pub runtime: Runtime,
    pub handle: EngineHandle,
    pub auth: RecordingAuthenticator,
    pub builder: RecordingBuilder,
}

/// Wire a [`Runtime`] with a recording authenticator, `FixedNamer` and the
/// given builder.
pub fn test_engine(
    cfg: &WatcherConfig,
    fs: Arc<dyn FileSystem>,
    builder: RecordingBuilder,
) -> TestEngine {
    test_engine_with_auth(cfg, fs, RecordingAuthenticator::new(), builder)
}

/// Like [`test_engine`], with a caller-configured authenticator.
pub fn test_engine_with_auth(
    cfg: &WatcherConfig,
    fs: Arc<dyn FileSystem>,
    auth: RecordingAuthenticator,
    builder: RecordingBuilder,
) -> TestEngine {
    let publisher = publisher_with(
        Arc::new(auth.clone()),
        Arc::new(FixedNamer::default()),
        Arc::new(builder.clone()),
    );
    let (runtime, handle) = Runtime::build(cfg, fs, publisher);
    TestEngine {
        runtime,
        handle,
        auth,
        builder,
    }
}

pub fn publisher_with(
    auth: Arc<dyn Authenticator>,
    namer: Arc<dyn Namer>,
    builder: Arc<dyn Builder>,
) -> Publisher {
    Publisher::new(auth, namer, builder)
}
