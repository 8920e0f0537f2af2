//! HTTP handlers: accept stats reports and show what was received.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use chrono::Local;
use dashmap::DashMap;
use serde::Serialize;

use netflood_core::StatsPayload;

/// Latest report per host name.
#[derive(Clone, Default)]
pub struct StatsState {
    latest: Arc<DashMap<String, HostStats>>,
}

impl StatsState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host_count(&self) -> usize {
        self.latest.len()
    }

    /// Latest report from `name`, if it has reported at all.
    pub fn host(&self, name: &str) -> Option<HostStats> {
        self.latest.get(name).map(|e| e.value().clone())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HostStats {
    #[serde(flatten)]
    pub payload: StatsPayload,
    pub received_at: String,
}

// ── POST /stats ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ReportResponse {
    pub status: &'static str,
    pub message: &'static str,
}

/// The body is parsed by hand so every malformed payload is a 400.
pub async fn handle_report(State(state): State<StatsState>, body: Bytes) -> Response {
    let payload: StatsPayload = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, "rejected malformed stats report");
            return (StatusCode::BAD_REQUEST, "Invalid JSON").into_response();
        }
    };

    tracing::info!(
        host = %payload.name,
        average = format_args!("{:.2} MB/s", payload.speed),
        total = format_args!("{:.2} MB ({:.2} GB)", payload.total, payload.total_gb()),
        window = %payload.time,
        "stats received"
    );

    let received_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    state.latest.insert(
        payload.name.clone(),
        HostStats {
            payload,
            received_at,
        },
    );

    Json(ReportResponse {
        status: "success",
        message: "Statistics received",
    })
    .into_response()
}

// ── GET /hosts ────────────────────────────────────────────────────────────────

pub async fn handle_hosts(State(state): State<StatsState>) -> Json<Vec<HostStats>> {
    let mut hosts: Vec<HostStats> = state.latest.iter().map(|e| e.value().clone()).collect();
    hosts.sort_by(|a, b| a.payload.name.cmp(&b.payload.name));
    Json(hosts)
}

// ── GET / ─────────────────────────────────────────────────────────────────────

const HOME_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="UTF-8"><title>netflood stats</title></head>
<body>
<h1>netflood stats server</h1>
<p><code>POST /stats</code> with <code>Content-Type: application/json</code>:</p>
<pre>{"name": "my-server", "speed": 15.5, "total": 1024.0, "time": "12:00-13:00"}</pre>
<p><code>GET /hosts</code> lists the latest report from each host.</p>
<p>Point a client at it with <code>netflood -d -s http://localhost:8080/stats</code>.</p>
</body>
</html>
"#;

pub async fn handle_home() -> Html<&'static str> {
    Html(HOME_PAGE)
}
