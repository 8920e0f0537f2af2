//! netflood — continuous download traffic generator.

use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;

use netflood_core::config::NetfloodConfig;
use netflood_core::{DownloadTask, TimeGate};
use netflood_engine::{Engine, EngineSettings, ReportSource, StatsReporter, TaskSource};

mod cli;
mod signal;

use cli::Args;

const URL_DISPLAY_LIMIT: usize = 60;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    let gate = TimeGate::parse(&config.run.time).with_context(|| {
        format!(
            "invalid time window {:?} (example: -t 12:00-13:00,14:00-15:00)",
            config.run.time
        )
    })?;

    let source = task_source(&config)?;
    let tasks = source
        .load()
        .await
        .with_context(|| format!("failed to load tasks from {source}"))?;

    print_banner(&config, &gate, &tasks);

    let engine = Engine::new(
        tasks,
        gate.clone(),
        EngineSettings {
            workers: config.run.workers,
            speed_file: config.run.speed_file.clone(),
            ..EngineSettings::default()
        },
    )?;

    let shutdown = CancellationToken::new();
    signal::spawn_handler(shutdown.clone());

    if !config.report.stats_api.is_empty() {
        let reporter = StatsReporter::new(config.report.stats_api.clone())?;
        let source = ReportSource {
            counter: engine.counter(),
            started_at: Instant::now(),
            window: gate.to_string(),
        };
        let period = Duration::from_secs(config.report.interval_secs.max(1));
        tokio::spawn(reporter.run(source, period, shutdown.clone()));
    }

    let summary = engine.run(shutdown).await?;
    println!(
        "Stopped. Downloaded {:.2} MB ({:.2} GB) in {:.0}s.",
        summary.total_mb(),
        summary.total_gb(),
        summary.elapsed.as_secs_f64()
    );
    Ok(())
}

/// Defaults, then config file and env, then flags.
fn load_config(args: &Args) -> Result<NetfloodConfig> {
    let path = match &args.config {
        Some(path) => path.clone(),
        None => {
            let path = NetfloodConfig::file_path();
            if let Err(e) = NetfloodConfig::write_default_if_missing(&path) {
                tracing::warn!(error = %e, "failed to write default config");
            }
            path
        }
    };
    let mut config = NetfloodConfig::load_from(&path)?;
    args.apply(&mut config);
    tracing::debug!(path = %path.display(), ?config, "config loaded");
    Ok(config)
}

fn task_source(config: &NetfloodConfig) -> Result<TaskSource> {
    if config.source.demo {
        return Ok(TaskSource::File(config.source.file.clone()));
    }
    if config.source.api.is_empty() {
        bail!("no task source: pass --api <URL> or --demo");
    }
    Ok(TaskSource::Api(config.source.api.clone()))
}

fn print_banner(config: &NetfloodConfig, gate: &TimeGate, tasks: &[DownloadTask]) {
    println!("netflood {}", env!("CARGO_PKG_VERSION"));
    println!("  workers:    {}", config.run.workers);
    println!("  window:     {gate}");
    if gate.is_enabled() && !gate.is_in_range_now() {
        println!(
            "  next start: {}",
            gate.next_start_now().format("%Y-%m-%d %H:%M:%S")
        );
    }
    println!("  speed file: {}", config.run.speed_file.display());
    if !config.report.stats_api.is_empty() {
        println!("  stats api:  {}", config.report.stats_api);
    }
    println!("  tasks:      {}", tasks.len());
    for (i, task) in tasks.iter().enumerate() {
        println!("    {:>3}. {} -> {}", i + 1, task.ip, truncate(&task.url, URL_DISPLAY_LIMIT));
    }
    println!("Press Ctrl+C to stop.");
}

fn truncate(s: &str, limit: usize) -> String {
    if s.chars().count() <= limit {
        return s.to_string();
    }
    let mut out: String = s.chars().take(limit).collect();
    out.push_str("...");
    out
}
