// src/lib.rs

pub mod candidate;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod publish;
pub mod types;
pub mod watch;

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{load_from_process_env, AppConfig};
use crate::engine::Runtime;
use crate::fs::{FileSystem, RealFileSystem};
use crate::publish::{DockerAuthenticator, MlflowDockerBuilder, MlflowNamer, Publisher};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - layered config loading
/// - the publish pipeline (registry login, image naming, build and push)
/// - the engine runtime
/// - the directory watcher
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_from_process_env(args.config.as_deref(), args.overrides())?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    // Fail at startup rather than on the first stable folder.
    let credentials = cfg.registry.credentials()?;

    let publisher = Publisher::new(
        Arc::new(DockerAuthenticator::new(&credentials)),
        Arc::new(MlflowNamer::new(
            credentials.namespace.clone(),
            cfg.watcher.ancestor_segment.clone(),
        )),
        Arc::new(MlflowDockerBuilder::new()),
    );

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let (runtime, handle) = Runtime::build(&cfg.watcher, Arc::clone(&fs), publisher);

    let watcher = crate::watch::spawn_watcher(&cfg.watcher.root, fs, handle.sender())?;
    info!(
        root = %watcher.root().display(),
        window = ?cfg.watcher.quiescence_window,
        detection = ?cfg.watcher.detection,
        "watching for model folders"
    );

    // Ctrl-C → graceful shutdown.
    {
        let handle = handle.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            handle.shutdown().await;
        });
    }

    let summary = runtime.run().await?;
    watcher.stop().await;

    info!(
        fired = summary.dispatch.fired,
        succeeded = summary.dispatch.succeeded,
        failed = summary.dispatch.failed,
        "modelwatch stopped"
    );
    Ok(())
}

/// Print the effective configuration without watching anything.
fn print_dry_run(cfg: &AppConfig) {
    let w = &cfg.watcher;
    let r = &cfg.registry;

    println!("modelwatch dry-run");
    println!("watcher:");
    println!("  root = {}", w.root.display());
    println!("  quiescence_window = {:?}", w.quiescence_window);
    println!("  poll_interval = {:?}", w.poll_interval);
    println!("  ancestor_segment = {}", w.ancestor_segment);
    println!("  leaf_name = {}", w.leaf_name);
    println!(
        "  ready_marker = {}",
        w.ready_marker.as_deref().unwrap_or("(none)")
    );
    println!("  detection = {:?}", w.detection);
    println!("  eviction = {:?}", w.eviction);
    println!();

    println!("registry:");
    println!("  url = {}", r.url);
    println!("  namespace = {}", r.namespace.as_deref().unwrap_or("(unset)"));
    println!("  username = {}", r.username.as_deref().unwrap_or("(unset)"));
    println!(
        "  password = {}",
        if r.password.is_some() { "<redacted>" } else { "(unset)" }
    );

    debug!("dry-run complete (nothing watched)");
}
