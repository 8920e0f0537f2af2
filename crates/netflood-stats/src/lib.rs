//! netflood-stats — receives stats reports from netflood instances.

pub mod handlers;

use axum::routing::{get, post};
use axum::Router;

pub use handlers::StatsState;

pub fn router(state: StatsState) -> Router {
    Router::new()
        .route("/", get(handlers::handle_home))
        .route("/stats", post(handlers::handle_report))
        .route("/hosts", get(handlers::handle_hosts))
        .with_state(state)
}

pub async fn serve(state: StatsState, port: u16) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(port, "stats server listening on 0.0.0.0");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
