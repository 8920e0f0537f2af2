//! Download tasks and the `<ip>,<url>` line format they are listed in.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One unit of work: fetch `url`, but connect to `ip`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadTask {
    pub ip: String,
    pub url: String,
}

impl DownloadTask {
    pub fn new(ip: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            url: url.into(),
        }
    }
}

impl fmt::Display for DownloadTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} via {}", self.url, self.ip)
    }
}

/// Parse one line. Splits on the first comma only, so URLs may contain commas.
/// Blank lines and lines without a comma yield `None`.
pub fn parse_task_line(line: &str) -> Option<DownloadTask> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let (ip, url) = line.split_once(',')?;
    Some(DownloadTask::new(ip.trim(), url.trim()))
}

/// Parse a whole listing, preserving line order. Unusable lines are skipped.
pub fn parse_tasks(content: &str) -> Vec<DownloadTask> {
    content.lines().filter_map(parse_task_line).collect()
}
