// src/publish/error.rs

use thiserror::Error;

/// Registry authentication failed.
#[derive(Error, Debug)]
pub enum LoginError {
    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("registry {registry} rejected login (exit code {code:?}): {stderr}")]
    Rejected {
        registry: String,
        code: Option<i32>,
        stderr: String,
    },
}

/// Building or pushing the image failed.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{step} for image {image} failed (exit code {code:?})")]
    StepFailed {
        step: String,
        image: String,
        code: Option<i32>,
    },
}

/// Any failure of a firing. Both variants end with the candidate `Failed`.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("login failed: {0}")]
    Login(#[from] LoginError),

    #[error("build failed: {0}")]
    Build(#[from] BuildError),
}
