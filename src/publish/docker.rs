// src/publish/docker.rs

//! Production collaborators: `docker login`, `mlflow models build-docker`
//! and `docker push`, run as child processes.

use std::path::Path;
use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::RegistryCredentials;
use crate::publish::{Authenticator, BoxFuture, BuildError, Builder, LoginError};

/// Logs in with `docker login <registry> -u <user> --password-stdin`.
///
/// The password is written to the child's stdin, never passed as an argument.
#[derive(Clone)]
pub struct DockerAuthenticator {
    program: String,
    registry: String,
    username: String,
    password: String,
}

impl std::fmt::Debug for DockerAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DockerAuthenticator")
            .field("program", &self.program)
            .field("registry", &self.registry)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl DockerAuthenticator {
    pub fn new(credentials: &RegistryCredentials) -> Self {
        Self {
            program: "docker".to_string(),
            registry: credentials.url.clone(),
            username: credentials.username.clone(),
            password: credentials.password.clone(),
        }
    }

    /// Use a different executable than `docker` (e.g. `podman`).
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    async fn run_login(&self) -> Result<(), LoginError> {
        info!(registry = %self.registry, "logging into container registry");

        let spawn_err = |source| LoginError::Spawn {
            program: self.program.clone(),
            source,
        };

        let mut child = Command::new(&self.program)
            .arg("login")
            .arg(&self.registry)
            .arg("-u")
            .arg(&self.username)
            .arg("--password-stdin")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(spawn_err)?;

        if let Some(mut stdin) = child.stdin.take() {
            // A program that exits without reading stdin closes the pipe;
            // its exit status is what matters, so a write error is not fatal.
            if let Err(e) = stdin.write_all(self.password.as_bytes()).await {
                debug!(error = %e, "login program closed stdin early");
            }
        }

        let output = child.wait_with_output().await.map_err(spawn_err)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(
                registry = %self.registry,
                code = ?output.status.code(),
                stderr = %stderr,
                "registry login failed"
            );
            return Err(LoginError::Rejected {
                registry: self.registry.clone(),
                code: output.status.code(),
                stderr,
            });
        }

        info!(registry = %self.registry, "logged into container registry");
        Ok(())
    }
}

impl Authenticator for DockerAuthenticator {
    fn login(&self) -> BoxFuture<'_, Result<(), LoginError>> {
        Box::pin(self.run_login())
    }
}

/// Builds with `mlflow models build-docker -m <path> -n <image> --enable-mlserver`
/// and then pushes with `docker push <image>`.
#[derive(Debug, Clone)]
pub struct MlflowDockerBuilder {
    mlflow_program: String,
    docker_program: String,
}

impl Default for MlflowDockerBuilder {
    fn default() -> Self {
        Self {
            mlflow_program: "mlflow".to_string(),
            docker_program: "docker".to_string(),
        }
    }
}

impl MlflowDockerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_programs(mlflow: impl Into<String>, docker: impl Into<String>) -> Self {
        Self {
            mlflow_program: mlflow.into(),
            docker_program: docker.into(),
        }
    }

    async fn run(&self, path: &Path, image: &str) -> Result<(), BuildError> {
        let mut build = Command::new(&self.mlflow_program);
        build
            .args(["models", "build-docker", "-m"])
            .arg(path)
            .args(["-n", image, "--enable-mlserver"]);
        run_step("mlflow build-docker", &self.mlflow_program, image, build).await?;

        let mut push = Command::new(&self.docker_program);
        push.args(["push", image]);
        run_step("docker push", &self.docker_program, image, push).await?;

        info!(image = %image, "built and pushed image");
        Ok(())
    }
}

impl Builder for MlflowDockerBuilder {
    fn build_and_publish<'a>(
        &'a self,
        path: &'a Path,
        image: &'a str,
    ) -> BoxFuture<'a, Result<(), BuildError>> {
        Box::pin(self.run(path, image))
    }
}

/// Run one build step to completion, streaming its output into the log.
async fn run_step(
    step: &str,
    program: &str,
    image: &str,
    mut cmd: Command,
) -> Result<(), BuildError> {
    info!(step, image = %image, "starting build step");

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|source| BuildError::Spawn {
        program: program.to_string(),
        source,
    })?;

    let stdout = child.stdout.take().map(|out| {
        let step = step.to_string();
        tokio::spawn(async move {
            let mut lines = BufReader::new(out).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(step = %step, "stdout: {}", line);
            }
        })
    });
    let stderr = child.stderr.take().map(|err| {
        let step = step.to_string();
        tokio::spawn(async move {
            let mut lines = BufReader::new(err).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(step = %step, "stderr: {}", line);
            }
        })
    });

    let status: ExitStatus = child.wait().await.map_err(|source| BuildError::Spawn {
        program: program.to_string(),
        source,
    })?;

    for reader in [stdout, stderr].into_iter().flatten() {
        let _ = reader.await;
    }

    if !status.success() {
        warn!(step, image = %image, code = ?status.code(), "build step failed");
        return Err(BuildError::StepFailed {
            step: step.to_string(),
            image: image.to_string(),
            code: status.code(),
        });
    }

    Ok(())
}
