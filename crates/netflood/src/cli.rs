//! Command-line flags. Anything given here wins over config file and env.

use std::path::PathBuf;

use clap::Parser;

use netflood_core::config::NetfloodConfig;

#[derive(Debug, Parser)]
#[command(
    name = "netflood",
    version,
    about = "Continuous download traffic generator with IP-pinned fetches"
)]
pub struct Args {
    /// Task list endpoint returning `<ip>,<url>` lines
    #[arg(short, long, value_name = "URL")]
    pub api: Option<String>,

    /// Number of concurrent download workers
    #[arg(short, long, value_name = "N")]
    pub workers: Option<usize>,

    /// Read tasks from the local task file instead of the API
    #[arg(short, long)]
    pub demo: bool,

    /// Local task file used with --demo
    #[arg(short, long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Daily download windows, e.g. 12:00-13:00,14:00-15:00
    #[arg(short, long, value_name = "SPEC")]
    pub time: Option<String>,

    /// Stats endpoint that receives periodic totals
    #[arg(short, long, value_name = "URL")]
    pub stats_api: Option<String>,

    /// Config file [default: $NETFLOOD_CONFIG or ~/.config/netflood/config.toml]
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// File holding the latest speed sample
    #[arg(long, value_name = "PATH")]
    pub speed_file: Option<PathBuf>,
}

impl Args {
    pub fn apply(&self, config: &mut NetfloodConfig) {
        if let Some(api) = &self.api {
            config.source.api = api.clone();
        }
        if let Some(workers) = self.workers {
            config.run.workers = workers;
        }
        if self.demo {
            config.source.demo = true;
        }
        if let Some(file) = &self.file {
            config.source.file = file.clone();
        }
        if let Some(time) = &self.time {
            config.run.time = time.clone();
        }
        if let Some(stats_api) = &self.stats_api {
            config.report.stats_api = stats_api.clone();
        }
        if let Some(speed_file) = &self.speed_file {
            config.run.speed_file = speed_file.clone();
        }
    }
}
