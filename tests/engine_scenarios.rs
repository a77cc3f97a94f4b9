// tests/engine_scenarios.rs

mod common;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use modelwatch::candidate::CandidateState;
use modelwatch::fs::mock::MockFileSystem;
use modelwatch::types::{DetectionMode, EvictionPolicy};
use modelwatch_test_utils::{
    init_tracing, test_engine, test_engine_with_auth, RecordingAuthenticator, RecordingBuilder,
    WatcherConfigBuilder,
};

use common::{dir_created, send, written, Clock};

const MODEL: &str = "/mlartifacts/111/222/model";

#[tokio::test(start_paused = true)]
async fn end_to_end_fires_once_at_first_quiet_tick() {
    init_tracing();
    let clock = Clock::start();
    let cfg = WatcherConfigBuilder::new().root("/mlartifacts").build();
    let engine = test_engine(&cfg, Arc::new(MockFileSystem::new()), RecordingBuilder::new());
    let handle = engine.handle.clone();
    let runtime = tokio::spawn(engine.runtime.run());

    send(&handle, dir_created(MODEL)).await;
    for t in [1.0, 2.0, 4.0] {
        clock.advance_to(t).await;
        send(&handle, written("/mlartifacts/111/222/model/MLmodel")).await;
    }

    clock.advance_to(5.0).await;
    let candidate = handle.table().get(Path::new(MODEL)).unwrap();
    assert_eq!(candidate.modification_count(), 3);
    let last = candidate.last_modified_at();
    assert!(last >= clock.at(4.0) && last < clock.at(4.1), "{last:?}");

    clock.advance_to(13.5).await;
    assert_eq!(engine.builder.call_count(), 0, "fired before the window elapsed");

    clock.advance_to(14.5).await;
    let calls = engine.builder.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].path, PathBuf::from(MODEL));
    assert_eq!(calls[0].image, "test/111-222-model");
    assert_eq!(engine.auth.login_count(), 1);
    assert_eq!(candidate.state(), CandidateState::Triggered);

    // Late writes and a re-creation change nothing.
    send(&handle, written("/mlartifacts/111/222/model/late.txt")).await;
    send(&handle, dir_created(MODEL)).await;
    clock.advance_to(60.0).await;
    assert_eq!(engine.builder.call_count(), 1);
    assert_eq!(candidate.modification_count(), 3);

    handle.shutdown().await;
    let summary = runtime.await.unwrap().unwrap();
    assert_eq!(summary.states.triggered, 1);
    assert_eq!(summary.dispatch.fired, 1);
}

#[tokio::test(start_paused = true)]
async fn deadline_mode_fires_exactly_when_the_window_closes() {
    init_tracing();
    let clock = Clock::start();
    let cfg = WatcherConfigBuilder::new()
        .detection(DetectionMode::Deadline)
        .build();
    let engine = test_engine(&cfg, Arc::new(MockFileSystem::new()), RecordingBuilder::new());
    let handle = engine.handle.clone();
    let runtime = tokio::spawn(engine.runtime.run());

    send(&handle, dir_created(MODEL)).await;
    for t in [1.0, 2.0, 4.0] {
        clock.advance_to(t).await;
        send(&handle, written("/mlartifacts/111/222/model/conda.yaml")).await;
    }

    clock.advance_to(13.9).await;
    assert_eq!(engine.builder.call_count(), 0);

    clock.advance_to(14.01).await;
    assert_eq!(engine.builder.call_count(), 1);

    handle.shutdown().await;
    runtime.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn steady_writes_hold_off_the_trigger() {
    init_tracing();
    let clock = Clock::start();
    let cfg = WatcherConfigBuilder::new().build();
    let engine = test_engine(&cfg, Arc::new(MockFileSystem::new()), RecordingBuilder::new());
    let handle = engine.handle.clone();
    let runtime = tokio::spawn(engine.runtime.run());

    send(&handle, dir_created(MODEL)).await;
    for t in [3.0, 6.0, 9.0] {
        clock.advance_to(t).await;
        send(&handle, written("/mlartifacts/111/222/model/data/part-0")).await;
    }

    clock.advance_to(12.5).await;
    assert_eq!(engine.builder.call_count(), 0);

    clock.advance_to(20.5).await;
    assert_eq!(engine.builder.call_count(), 1);

    handle.shutdown().await;
    runtime.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn failure_is_isolated_to_its_candidate() {
    init_tracing();
    let clock = Clock::start();
    let cfg = WatcherConfigBuilder::new().build();
    let builder = RecordingBuilder::new().failing_on("/mlartifacts/1/a/model");
    let engine = test_engine(&cfg, Arc::new(MockFileSystem::new()), builder);
    let handle = engine.handle.clone();
    let runtime = tokio::spawn(engine.runtime.run());

    send(&handle, dir_created("/mlartifacts/1/a/model")).await;
    send(&handle, dir_created("/mlartifacts/2/b/model")).await;
    clock.advance_to(30.0).await;

    let failed = handle.table().get(Path::new("/mlartifacts/1/a/model")).unwrap();
    let ok = handle.table().get(Path::new("/mlartifacts/2/b/model")).unwrap();
    assert_eq!(failed.state(), CandidateState::Failed);
    assert!(failed.failure().unwrap().contains("docker push"));
    assert_eq!(ok.state(), CandidateState::Triggered);
    assert_eq!(ok.failure(), None);

    // A failed candidate is terminal: no retry, no resurrection.
    send(&handle, written("/mlartifacts/1/a/model/retry.txt")).await;
    clock.advance_to(60.0).await;
    assert_eq!(engine.builder.call_count(), 2);
    assert_eq!(failed.state(), CandidateState::Failed);

    handle.shutdown().await;
    let summary = runtime.await.unwrap().unwrap();
    assert_eq!(summary.states.failed, 1);
    assert_eq!(summary.states.triggered, 1);
}

#[tokio::test(start_paused = true)]
async fn rejected_login_fails_only_its_own_candidate() {
    init_tracing();
    let clock = Clock::start();
    let cfg = WatcherConfigBuilder::new().build();
    let auth = RecordingAuthenticator::new().rejecting_first(1);
    let engine = test_engine_with_auth(
        &cfg,
        Arc::new(MockFileSystem::new()),
        auth,
        RecordingBuilder::new(),
    );
    let handle = engine.handle.clone();
    let runtime = tokio::spawn(engine.runtime.run());

    send(&handle, dir_created("/mlartifacts/1/a/model")).await;
    clock.advance_to(5.0).await;
    send(&handle, dir_created("/mlartifacts/2/b/model")).await;
    clock.advance_to(30.0).await;

    let rejected = handle.table().get(Path::new("/mlartifacts/1/a/model")).unwrap();
    let ok = handle.table().get(Path::new("/mlartifacts/2/b/model")).unwrap();
    assert_eq!(rejected.state(), CandidateState::Failed);
    assert!(rejected.failure().unwrap().contains("unauthorized"));
    assert_eq!(ok.state(), CandidateState::Triggered);
    assert_eq!(engine.auth.login_count(), 2);
    assert_eq!(
        engine.builder.built_paths(),
        vec![PathBuf::from("/mlartifacts/2/b/model")]
    );

    handle.shutdown().await;
    let summary = runtime.await.unwrap().unwrap();
    assert_eq!(summary.states.failed, 1);
    assert_eq!(summary.states.triggered, 1);
    assert_eq!(summary.dispatch.failed, 1);
    assert_eq!(summary.dispatch.succeeded, 1);
}

#[tokio::test(start_paused = true)]
async fn slow_build_does_not_delay_other_candidates() {
    init_tracing();
    let clock = Clock::start();
    let cfg = WatcherConfigBuilder::new().build();
    let builder = RecordingBuilder::new().with_delay(Duration::from_secs(120));
    let engine = test_engine(&cfg, Arc::new(MockFileSystem::new()), builder);
    let handle = engine.handle.clone();
    let runtime = tokio::spawn(engine.runtime.run());

    send(&handle, dir_created("/mlartifacts/1/a/model")).await;
    clock.advance_to(5.0).await;
    send(&handle, dir_created("/mlartifacts/2/b/model")).await;

    clock.advance_to(16.0).await;
    assert_eq!(engine.builder.call_count(), 2);
    let a = handle.table().get(Path::new("/mlartifacts/1/a/model")).unwrap();
    let b = handle.table().get(Path::new("/mlartifacts/2/b/model")).unwrap();
    assert_eq!(a.state(), CandidateState::Claimed);
    assert_eq!(b.state(), CandidateState::Claimed);

    // Writes keep flowing while builds run.
    send(&handle, dir_created("/mlartifacts/3/c/model")).await;
    send(&handle, written("/mlartifacts/3/c/model/MLmodel")).await;
    clock.advance_to(17.0).await;
    let c = handle.table().get(Path::new("/mlartifacts/3/c/model")).unwrap();
    assert_eq!(c.modification_count(), 1);

    handle.shutdown().await;
    runtime.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn shutdown_waits_for_in_flight_builds() {
    init_tracing();
    let clock = Clock::start();
    let cfg = WatcherConfigBuilder::new().build();
    let builder = RecordingBuilder::new().with_delay(Duration::from_secs(30));
    let engine = test_engine(&cfg, Arc::new(MockFileSystem::new()), builder);
    let handle = engine.handle.clone();
    let runtime = tokio::spawn(engine.runtime.run());

    send(&handle, dir_created(MODEL)).await;
    clock.advance_to(5.0).await;
    send(&handle, dir_created("/mlartifacts/9/9/model")).await;
    clock.advance_to(10.5).await;
    // Second candidate is still pending when shutdown begins.
    send(&handle, written("/mlartifacts/9/9/model/MLmodel")).await;
    assert_eq!(engine.builder.call_count(), 1);

    handle.shutdown().await;
    let summary = runtime.await.unwrap().unwrap();

    assert!(clock.elapsed() >= Duration::from_secs(40), "{:?}", clock.elapsed());
    assert_eq!(summary.states.triggered, 1);
    assert_eq!(summary.states.pending, 1);
    assert_eq!(engine.builder.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn eviction_policy_controls_refiring() {
    init_tracing();

    for (policy, expected_builds) in [
        (EvictionPolicy::Never, 1),
        (EvictionPolicy::AfterResolution, 2),
    ] {
        let clock = Clock::start();
        let cfg = WatcherConfigBuilder::new().eviction(policy).build();
        let engine = test_engine(&cfg, Arc::new(MockFileSystem::new()), RecordingBuilder::new());
        let handle = engine.handle.clone();
        let runtime = tokio::spawn(engine.runtime.run());

        send(&handle, dir_created(MODEL)).await;
        clock.advance_to(20.0).await;
        send(&handle, dir_created(MODEL)).await;
        clock.advance_to(40.0).await;

        assert_eq!(engine.builder.call_count(), expected_builds, "{policy:?}");

        handle.shutdown().await;
        let summary = runtime.await.unwrap().unwrap();
        assert_eq!(summary.dispatch.fired as usize, expected_builds);
    }
}

#[tokio::test(start_paused = true)]
async fn ready_marker_gates_firing() {
    init_tracing();
    let clock = Clock::start();
    let fs = MockFileSystem::new();
    fs.add_dir(MODEL);
    let cfg = WatcherConfigBuilder::new().ready_marker("MLmodel").build();
    let engine = test_engine(&cfg, Arc::new(fs.clone()), RecordingBuilder::new());
    let handle = engine.handle.clone();
    let runtime = tokio::spawn(engine.runtime.run());

    send(&handle, dir_created(MODEL)).await;
    clock.advance_to(29.0).await;
    assert_eq!(engine.builder.call_count(), 0);

    fs.add_file("/mlartifacts/111/222/model/MLmodel", b"flavors: {}".to_vec());
    clock.advance_to(31.0).await;
    assert_eq!(engine.builder.call_count(), 1);

    handle.shutdown().await;
    runtime.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn nested_model_folders_are_tracked_independently() {
    init_tracing();
    let clock = Clock::start();
    let outer = "/mlartifacts/1/2/model";
    let inner = "/mlartifacts/1/2/model/sub/model";
    let cfg = WatcherConfigBuilder::new().build();
    let engine = test_engine(&cfg, Arc::new(MockFileSystem::new()), RecordingBuilder::new());
    let handle = engine.handle.clone();
    let runtime = tokio::spawn(engine.runtime.run());

    send(&handle, dir_created(outer)).await;
    send(&handle, dir_created("/mlartifacts/1/2/model/sub")).await;
    send(&handle, dir_created(inner)).await;
    clock.advance_to(1.0).await;
    send(&handle, written("/mlartifacts/1/2/model/sub/model/w.bin")).await;
    clock.advance_to(1.5).await;

    let o = handle.table().get(Path::new(outer)).unwrap();
    let i = handle.table().get(Path::new(inner)).unwrap();
    // `sub` and the inner `model` directory count as activity for the outer one.
    assert_eq!(o.modification_count(), 2);
    assert_eq!(i.modification_count(), 1);

    clock.advance_to(30.0).await;
    let mut built = engine.builder.built_paths();
    built.sort();
    assert_eq!(built, vec![PathBuf::from(outer), PathBuf::from(inner)]);

    handle.shutdown().await;
    runtime.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn observer_faults_do_not_stop_the_engine() {
    init_tracing();
    let clock = Clock::start();
    let cfg = WatcherConfigBuilder::new().build();
    let engine = test_engine(&cfg, Arc::new(MockFileSystem::new()), RecordingBuilder::new());
    let handle = engine.handle.clone();
    let runtime = tokio::spawn(engine.runtime.run());

    send(
        &handle,
        modelwatch::engine::EngineEvent::ObserverFault {
            message: "event queue overflow".into(),
        },
    )
    .await;
    send(&handle, dir_created(MODEL)).await;
    clock.advance_to(15.0).await;
    assert_eq!(engine.builder.call_count(), 1);

    handle.shutdown().await;
    runtime.await.unwrap().unwrap();
}
