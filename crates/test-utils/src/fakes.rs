//! Fake publish collaborators that record calls and fail on demand.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use modelwatch::publish::{Authenticator, BoxFuture, BuildError, Builder, LoginError, Namer};

/// Counts logins. Succeeds unless told to reject the first few.
#[derive(Debug, Clone, Default)]
pub struct RecordingAuthenticator {
    logins: Arc<AtomicUsize>,
    rejections: usize,
}

impl RecordingAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the first `n` logins, then accept.
    pub fn rejecting_first(mut self, n: usize) -> Self {
        self.rejections = n;
        self
    }

    pub fn login_count(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }
}

impl Authenticator for RecordingAuthenticator {
    fn login(&self) -> BoxFuture<'_, Result<(), LoginError>> {
        let attempt = self.logins.fetch_add(1, Ordering::SeqCst);
        let rejected = attempt < self.rejections;
        Box::pin(async move {
            if rejected {
                return Err(LoginError::Rejected {
                    registry: "registry.test".to_string(),
                    code: Some(1),
                    stderr: "unauthorized: token expired".to_string(),
                });
            }
            Ok(())
        })
    }
}

/// Rejects every login.
#[derive(Debug, Clone, Default)]
pub struct FailingAuthenticator;

impl Authenticator for FailingAuthenticator {
    fn login(&self) -> BoxFuture<'_, Result<(), LoginError>> {
        Box::pin(async {
            Err(LoginError::Rejected {
                registry: "registry.test".to_string(),
                code: Some(1),
                stderr: "unauthorized: incorrect username or password".to_string(),
            })
        })
    }
}

/// Names images `<prefix>/<last three path components joined by '-'>`.
#[derive(Debug, Clone)]
pub struct FixedNamer {
    prefix: String,
}

impl FixedNamer {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for FixedNamer {
    fn default() -> Self {
        Self::new("test")
    }
}

impl Namer for FixedNamer {
    fn derive_image_name(&self, path: &Path) -> String {
        let parts: Vec<String> = path
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_lowercase())
            .collect();
        let tail = &parts[parts.len().saturating_sub(3)..];
        format!("{}/{}", self.prefix, tail.join("-"))
    }
}

/// One recorded build call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCall {
    pub path: PathBuf,
    pub image: String,
}

/// Records every build, optionally taking time and failing for chosen paths.
#[derive(Debug, Clone, Default)]
pub struct RecordingBuilder {
    calls: Arc<Mutex<Vec<BuildCall>>>,
    fail_on: Arc<Mutex<HashSet<PathBuf>>>,
    delay: Option<Duration>,
}

impl RecordingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the build for `path` with a non-zero push.
    pub fn failing_on(self, path: impl Into<PathBuf>) -> Self {
        self.fail_on.lock().unwrap().insert(path.into());
        self
    }

    /// Make every build take `delay` (tokio time, so pausable).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<BuildCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn built_paths(&self) -> Vec<PathBuf> {
        self.calls().into_iter().map(|c| c.path).collect()
    }
}

impl Builder for RecordingBuilder {
    fn build_and_publish<'a>(
        &'a self,
        path: &'a Path,
        image: &'a str,
    ) -> BoxFuture<'a, Result<(), BuildError>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(BuildCall {
                path: path.to_path_buf(),
                image: image.to_string(),
            });

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            if self.fail_on.lock().unwrap().contains(path) {
                return Err(BuildError::StepFailed {
                    step: "docker push".to_string(),
                    image: image.to_string(),
                    code: Some(1),
                });
            }
            Ok(())
        })
    }
}
