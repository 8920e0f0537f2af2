//! netflood integration test harness.
//!
//! Every test runs the real engine against a mirror served by axum on
//! loopback. Tasks name a fake host (`mirror.test`) and pin it to
//! 127.0.0.1, so a passing test also shows the pinning works.
//!
//!   cargo test --test integration

use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use bytes::Bytes;

use netflood_core::DownloadTask;

mod pinning;
mod reporting;
mod shutdown;

// ── Mock mirror ───────────────────────────────────────────────────────────────

pub const MIB: usize = 1024 * 1024;

#[derive(Clone, Copy, Debug)]
pub enum MirrorMode {
    /// 200 with a body of this many bytes.
    Blob(usize),
    /// 404, empty body.
    NotFound,
    /// 200 with a small body, after this delay.
    Slow(Duration),
}

/// Request counters as the mirror sees them.
#[derive(Default)]
pub struct Hits {
    started: AtomicUsize,
    completed: AtomicUsize,
}

impl Hits {
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
struct MirrorState {
    mode: MirrorMode,
    blob: Bytes,
    hits: Arc<Hits>,
}

pub struct Mirror {
    pub addr: SocketAddr,
    pub hits: Arc<Hits>,
}

impl Mirror {
    /// A task that reaches this mirror through a pinned fake host name.
    pub fn task(&self) -> DownloadTask {
        DownloadTask::new(
            "127.0.0.1",
            format!("http://mirror.test:{}/blob", self.addr.port()),
        )
    }
}

pub async fn start_mirror(mode: MirrorMode) -> Result<Mirror> {
    let blob = match mode {
        MirrorMode::Blob(len) => Bytes::from(vec![0u8; len]),
        MirrorMode::NotFound => Bytes::new(),
        MirrorMode::Slow(_) => Bytes::from_static(b"slow mirror payload"),
    };
    let hits = Arc::new(Hits::default());
    let state = MirrorState {
        mode,
        blob,
        hits: hits.clone(),
    };

    let app = Router::new().route("/blob", get(serve_blob)).with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .context("failed to bind mirror")?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(Mirror { addr, hits })
}

async fn serve_blob(State(state): State<MirrorState>) -> Response {
    state.hits.started.fetch_add(1, Ordering::SeqCst);
    let response = match state.mode {
        MirrorMode::Blob(_) => state.blob.clone().into_response(),
        MirrorMode::NotFound => StatusCode::NOT_FOUND.into_response(),
        MirrorMode::Slow(delay) => {
            tokio::time::sleep(delay).await;
            state.blob.clone().into_response()
        }
    };
    state.hits.completed.fetch_add(1, Ordering::SeqCst);
    response
}

// ── Speed file helpers ────────────────────────────────────────────────────────

/// The "总下载: X MB" figure from the latest sample line.
pub fn sampled_total_mb(speed_file: &Path) -> Result<f64> {
    let text = std::fs::read_to_string(speed_file)
        .with_context(|| format!("failed to read {}", speed_file.display()))?;
    let line = text
        .lines()
        .find(|l| l.contains("总下载: "))
        .context("no speed sample in file")?;
    let figure = line
        .rsplit("总下载: ")
        .next()
        .and_then(|rest| rest.strip_suffix(" MB"))
        .context("unexpected speed line format")?;
    Ok(figure.trim().parse()?)
}

#[test]
fn sampled_total_is_parsed_from_speed_line() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("speed");
    std::fs::write(
        &path,
        "2024-05-01 12:00:00 | 当前速度: 1.00 MB/s | 平均速度: 2.00 MB/s | 总下载: 42.50 MB\n",
    )
    .unwrap();
    assert_eq!(sampled_total_mb(&path).unwrap(), 42.5);
}
