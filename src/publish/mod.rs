// src/publish/mod.rs

//! The downstream action fired once per stable candidate.
//!
//! The engine only sees three narrow collaborator traits:
//! - [`Authenticator`]: log in to the registry (called once per firing).
//! - [`Namer`]: derive a deterministic, lowercase image name from a path.
//! - [`Builder`]: build and push the image.
//!
//! [`Publisher`] strings them together. Production implementations shell out
//! to `docker` and `mlflow` ([`docker`]); tests plug in fakes that record
//! calls and fail on demand.

pub mod docker;
pub mod error;
pub mod naming;
pub mod pipeline;

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

pub use docker::{DockerAuthenticator, MlflowDockerBuilder};
pub use error::{BuildError, LoginError, PublishError};
pub use naming::{DateSource, MlflowNamer};
pub use pipeline::Publisher;

/// Boxed, sendable future returned by collaborator methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Registry login. Must be idempotent; it is called before every build.
pub trait Authenticator: Send + Sync {
    fn login(&self) -> BoxFuture<'_, Result<(), LoginError>>;
}

/// Maps a candidate path to the image name handed to the builder.
pub trait Namer: Send + Sync {
    fn derive_image_name(&self, path: &Path) -> String;
}

/// Black-box build-and-publish step.
pub trait Builder: Send + Sync {
    fn build_and_publish<'a>(
        &'a self,
        path: &'a Path,
        image: &'a str,
    ) -> BoxFuture<'a, Result<(), BuildError>>;
}
