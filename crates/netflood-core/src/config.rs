//! Configuration for netflood.
//!
//! Resolution order: defaults → config file → environment variables.
//! Command-line flags are applied on top by the binary.
//!
//! Config file location:
//!   1. $NETFLOOD_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/netflood/config.toml
//!   3. ~/.config/netflood/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetfloodConfig {
    pub source: SourceConfig,
    pub run: RunConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Listing endpoint returning `<ip>,<url>` lines.
    pub api: String,
    /// Local listing used when `demo` is set.
    pub file: PathBuf,
    /// Read `file` instead of calling `api`.
    pub demo: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Number of concurrent download workers.
    pub workers: usize,
    /// Daily time windows, e.g. "12:00-13:00,14:00-15:00". Empty = always on.
    pub time: String,
    /// Where the latest speed sample is kept.
    pub speed_file: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Stats endpoint. Empty = reporting disabled.
    pub stats_api: String,
    pub interval_secs: u64,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            api: String::new(),
            file: PathBuf::from("demo.txt"),
            demo: false,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            workers: 12,
            time: String::new(),
            speed_file: PathBuf::from("./speed"),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            stats_api: String::new(),
            interval_secs: 10,
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
        .join("netflood")
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl NetfloodConfig {
    /// Load config from `path` (missing file = defaults), then apply env overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))?
        } else {
            NetfloodConfig::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("NETFLOOD_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config to `path` if nothing is there yet.
    pub fn write_default_if_missing(path: &Path) -> Result<(), ConfigError> {
        if path.exists() {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::WriteFailed(path.to_path_buf(), e))?;
        }
        let text = toml::to_string_pretty(&NetfloodConfig::default())
            .map_err(ConfigError::SerializeFailed)?;
        std::fs::write(path, text).map_err(|e| ConfigError::WriteFailed(path.to_path_buf(), e))
    }

    /// Apply NETFLOOD_* overrides. `lookup` is `std::env::var` outside tests.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("NETFLOOD_SOURCE__API") {
            self.source.api = v;
        }
        if let Some(v) = lookup("NETFLOOD_SOURCE__FILE") {
            self.source.file = PathBuf::from(v);
        }
        if let Some(v) = lookup("NETFLOOD_SOURCE__DEMO") {
            self.source.demo = v == "true" || v == "1";
        }
        if let Some(v) = lookup("NETFLOOD_RUN__WORKERS") {
            if let Ok(n) = v.parse() {
                self.run.workers = n;
            }
        }
        if let Some(v) = lookup("NETFLOOD_RUN__TIME") {
            self.run.time = v;
        }
        if let Some(v) = lookup("NETFLOOD_RUN__SPEED_FILE") {
            self.run.speed_file = PathBuf::from(v);
        }
        if let Some(v) = lookup("NETFLOOD_REPORT__STATS_API") {
            self.report.stats_api = v;
        }
    }
}
