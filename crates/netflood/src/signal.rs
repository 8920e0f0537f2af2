//! Two-stage shutdown: the first signal cancels the run and lets in-flight
//! downloads finish, the second exits the process immediately.

use tokio_util::sync::CancellationToken;

pub fn spawn_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        if let Err(e) = wait_for_signal().await {
            tracing::error!(error = %e, "failed to listen for shutdown signals");
            return;
        }
        tracing::info!("shutdown signal received, finishing in-flight downloads");
        println!("\nStopping... waiting for in-flight downloads (press Ctrl+C again to force quit)");
        shutdown.cancel();

        if wait_for_signal().await.is_ok() {
            tracing::warn!("second signal received, exiting immediately");
            std::process::exit(1);
        }
    });
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        r = tokio::signal::ctrl_c() => r,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
