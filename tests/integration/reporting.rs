use std::time::{Duration, Instant};

use netflood_engine::{ByteCounter, CancellationToken, ReportSource, StatsReporter};
use netflood_stats::StatsState;
use tracing::Instrument;
use tracing_test::traced_test;

use crate::*;

async fn start_stats_server() -> Result<(SocketAddr, StatsState)> {
    let state = StatsState::new();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = netflood_stats::router(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((addr, state))
}

#[tokio::test]
async fn reporter_delivers_totals_to_stats_server() {
    let (addr, state) = start_stats_server().await.unwrap();
    let reporter =
        StatsReporter::with_hostname(format!("http://{addr}/stats"), "edge-it").unwrap();

    let counter = ByteCounter::new();
    counter.add(5 * MIB as u64);
    let source = ReportSource {
        counter,
        started_at: Instant::now(),
        window: "12:00-13:00".into(),
    };

    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(reporter.run(source, Duration::from_millis(100), shutdown.clone()));
    tokio::time::sleep(Duration::from_millis(350)).await;
    shutdown.cancel();
    handle.await.unwrap();

    let host = state.host("edge-it").expect("report should have arrived");
    assert_eq!(host.payload.total, 5.0);
    assert_eq!(host.payload.time, "12:00-13:00");
    assert!(host.payload.speed > 0.0);
    assert_eq!(state.host_count(), 1);
}

#[tokio::test]
#[traced_test]
async fn failed_reports_are_logged_and_do_not_stop_the_reporter() {
    let reporter = StatsReporter::with_hostname("http://127.0.0.1:9/stats", "edge-it").unwrap();
    let source = ReportSource {
        counter: ByteCounter::new(),
        started_at: Instant::now(),
        window: "全天候运行".into(),
    };

    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(
        reporter
            .run(source, Duration::from_millis(100), shutdown.clone())
            .in_current_span(),
    );
    tokio::time::sleep(Duration::from_millis(450)).await;
    assert!(!handle.is_finished());
    shutdown.cancel();
    handle.await.unwrap();

    assert!(logs_contain("stats report failed"));
}
