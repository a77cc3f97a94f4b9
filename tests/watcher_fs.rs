// tests/watcher_fs.rs

//! Real filesystem + `notify` tests. These run on the wall clock.

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::time::timeout;

use modelwatch::engine::EngineEvent;
use modelwatch::fs::{FileSystem, RealFileSystem};
use modelwatch::watch::spawn_watcher;
use modelwatch_test_utils::{init_tracing, test_engine, with_timeout, RecordingBuilder, WatcherConfigBuilder};

type TestResult = Result<(), Box<dyn Error>>;

fn artifacts_root() -> Result<(TempDir, PathBuf), Box<dyn Error>> {
    let tmp = tempfile::tempdir()?;
    let root = tmp.path().join("mlartifacts");
    std::fs::create_dir(&root)?;
    let root = root.canonicalize()?;
    Ok((tmp, root))
}

/// Receive until `pred` matches or the deadline passes.
async fn wait_for<F>(rx: &mut mpsc::Receiver<EngineEvent>, mut pred: F) -> bool
where
    F: FnMut(&EngineEvent) -> bool,
{
    let found = timeout(Duration::from_secs(5), async {
        while let Some(event) = rx.recv().await {
            if pred(&event) {
                return true;
            }
        }
        false
    })
    .await;
    found.unwrap_or(false)
}

#[tokio::test]
async fn nested_mkdir_is_reported_as_directory_creation() -> TestResult {
    init_tracing();
    let (_tmp, root) = artifacts_root()?;
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let (tx, mut rx) = mpsc::channel(256);
    let _watcher = spawn_watcher(&root, fs, tx)?;

    let model = root.join("111").join("222").join("model");
    std::fs::create_dir_all(&model)?;

    let seen = wait_for(&mut rx, |e| {
        matches!(e, EngineEvent::DirectoryCreated { path } if path == &model)
    })
    .await;
    assert!(seen, "no creation event for {}", model.display());

    let weights = model.join("weights.bin");
    std::fs::write(&weights, b"0123")?;
    let seen = wait_for(&mut rx, |e| {
        matches!(e, EngineEvent::PathModified { path } if path == &weights)
    })
    .await;
    assert!(seen, "no write event for {}", weights.display());
    Ok(())
}

#[tokio::test]
async fn missing_root_is_rejected() {
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let (tx, _rx) = mpsc::channel(1);
    assert!(spawn_watcher(Path::new("/no/such/mlartifacts/dir"), fs, tx).is_err());
}

#[tokio::test]
async fn model_folder_written_on_disk_is_published_once() -> TestResult {
    init_tracing();
    let (_tmp, root) = artifacts_root()?;
    let cfg = WatcherConfigBuilder::new()
        .root(&root)
        .quiescence(Duration::from_millis(400))
        .poll_interval(Duration::from_millis(50))
        .build();
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let engine = test_engine(&cfg, Arc::clone(&fs), RecordingBuilder::new());
    let watcher = spawn_watcher(&root, fs, engine.handle.sender())?;
    let handle = engine.handle.clone();
    let runtime = tokio::spawn(engine.runtime.run());

    let model = root.join("7").join("abcdef0123456789").join("model");
    std::fs::create_dir_all(&model)?;
    for i in 0..3 {
        std::fs::write(model.join(format!("part-{i}")), vec![0u8; 1024])?;
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    std::fs::write(model.join("MLmodel"), b"flavors: {}")?;

    with_timeout(async {
        while engine.builder.call_count() == 0 {
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    })
    .await;

    // Give a duplicate firing every chance to show up.
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(engine.builder.built_paths(), vec![model.clone()]);

    handle.shutdown().await;
    let summary = runtime.await??;
    assert_eq!(summary.states.triggered, 1);
    watcher.stop().await;
    Ok(())
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn symlinked_root_keeps_the_ancestor_segment_in_candidate_paths() -> TestResult {
    init_tracing();
    let tmp = tempfile::tempdir()?;
    let store = tmp.path().join("store");
    std::fs::create_dir(&store)?;
    let root = tmp.path().join("mlartifacts");
    std::os::unix::fs::symlink(&store, &root)?;

    let cfg = WatcherConfigBuilder::new()
        .root(&root)
        .quiescence(Duration::from_millis(400))
        .poll_interval(Duration::from_millis(50))
        .build();
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let engine = test_engine(&cfg, Arc::clone(&fs), RecordingBuilder::new());
    let watcher = spawn_watcher(&root, fs, engine.handle.sender())?;
    assert_eq!(watcher.root(), root.as_path());
    let handle = engine.handle.clone();
    let runtime = tokio::spawn(engine.runtime.run());

    let model = root.join("1").join("2").join("model");
    std::fs::create_dir_all(&model)?;
    std::fs::write(model.join("MLmodel"), b"flavors: {}")?;

    with_timeout(async {
        while engine.builder.call_count() == 0 {
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    })
    .await;

    assert!(handle.table().get(&model).is_some());
    assert_eq!(engine.builder.built_paths(), vec![model.clone()]);

    handle.shutdown().await;
    runtime.await??;
    watcher.stop().await;
    Ok(())
}
