//! netflood-stats — standalone stats receiver.

use anyhow::Result;
use clap::Parser;

use netflood_stats::StatsState;

#[derive(Debug, Parser)]
#[command(author, version, about = "Receives and logs netflood stats reports", long_about = None)]
struct Args {
    /// Port to listen on (all interfaces)
    #[arg(short, long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    println!("netflood stats server");
    println!("  report endpoint : http://localhost:{}/stats", args.port);
    println!("  latest per host : http://localhost:{}/hosts", args.port);
    println!("  client example  : netflood -d -s http://localhost:{}/stats", args.port);

    tokio::select! {
        r = netflood_stats::serve(StatsState::new(), args.port) => r,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
            Ok(())
        }
    }
}
