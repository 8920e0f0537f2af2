use std::time::Duration;

use netflood_core::TimeGate;
use netflood_engine::{CancellationToken, Engine, EngineSettings};

use crate::*;

const WORKERS: usize = 3;

#[tokio::test]
async fn shutdown_waits_for_in_flight_and_starts_nothing_new() {
    let mirror = start_mirror(MirrorMode::Slow(Duration::from_millis(300)))
        .await
        .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let settings = EngineSettings {
        workers: WORKERS,
        speed_file: dir.path().join("speed"),
        ..EngineSettings::default()
    };

    let engine = Engine::new(vec![mirror.task()], TimeGate::always_on(), settings.clone()).unwrap();
    let shutdown = CancellationToken::new();
    let run = tokio::spawn(engine.run(shutdown.clone()));

    // Land the cancel in the middle of a round of slow fetches.
    tokio::time::sleep(Duration::from_millis(1_150)).await;
    let started_at_cancel = mirror.hits.started();
    assert!(started_at_cancel > 0);
    shutdown.cancel();

    let summary = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("engine should stop promptly")
        .unwrap()
        .unwrap();

    // Every request the mirror saw ran to completion.
    let started = mirror.hits.started();
    assert_eq!(mirror.hits.completed(), started);
    assert_eq!(summary.fetches.completed as usize, started);
    // At most one already-dequeued task per worker may start after cancel.
    assert!(
        started <= started_at_cancel + WORKERS,
        "{started} started, {started_at_cancel} at cancel"
    );

    tokio::time::sleep(Duration::from_millis(700)).await;
    assert_eq!(mirror.hits.started(), started, "fetch started after shutdown");

    let text = std::fs::read_to_string(&settings.speed_file).unwrap();
    assert_eq!(text.matches("下载结束").count(), 1, "{text}");
}

#[tokio::test]
async fn closed_window_downloads_nothing() {
    let mirror = start_mirror(MirrorMode::Blob(MIB)).await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let settings = EngineSettings {
        workers: 2,
        speed_file: dir.path().join("speed"),
        ..EngineSettings::default()
    };
    // Zero-width window: never open.
    let gate = TimeGate::parse("10:00-10:00").unwrap();

    let engine = Engine::new(vec![mirror.task()], gate, settings).unwrap();
    let shutdown = CancellationToken::new();
    let run = tokio::spawn(engine.run(shutdown.clone()));

    tokio::time::sleep(Duration::from_millis(500)).await;
    shutdown.cancel();
    let summary = run.await.unwrap().unwrap();

    assert_eq!(mirror.hits.started(), 0);
    assert_eq!(summary.total_bytes, 0);
}
