// src/publish/pipeline.rs

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::publish::{Authenticator, Builder, Namer, PublishError};

/// Login → name → build-and-push, in that order.
#[derive(Clone)]
pub struct Publisher {
    authenticator: Arc<dyn Authenticator>,
    namer: Arc<dyn Namer>,
    builder: Arc<dyn Builder>,
}

impl fmt::Debug for Publisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publisher").finish_non_exhaustive()
    }
}

impl Publisher {
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        namer: Arc<dyn Namer>,
        builder: Arc<dyn Builder>,
    ) -> Self {
        Self {
            authenticator,
            namer,
            builder,
        }
    }

    /// Run the whole action for one candidate and return the image name.
    pub async fn publish(&self, path: &Path) -> Result<String, PublishError> {
        debug!(path = %path.display(), "logging in to registry");
        self.authenticator.login().await?;

        let image = self.namer.derive_image_name(path);
        info!(path = %path.display(), image = %image, "building and pushing image");

        self.builder.build_and_publish(path, &image).await?;
        Ok(image)
    }
}
