//! Task sources: a local listing file or a remote listing endpoint.

use std::path::PathBuf;
use std::time::Duration;

use netflood_core::{parse_tasks, DownloadTask};

const SOURCE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("failed to fetch task list from {0}: {1}")]
    Request(String, reqwest::Error),
    #[error("task list endpoint {0} returned {1}")]
    Status(String, reqwest::StatusCode),
    #[error("no download tasks in {0}")]
    Empty(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskSource {
    File(PathBuf),
    Api(String),
}

impl TaskSource {
    pub async fn load(&self) -> Result<Vec<DownloadTask>, SourceError> {
        let content = match self {
            TaskSource::File(path) => tokio::fs::read_to_string(path)
                .await
                .map_err(|e| SourceError::Read(path.clone(), e))?,
            TaskSource::Api(url) => fetch_listing(url).await?,
        };

        let tasks = parse_tasks(&content);
        if tasks.is_empty() {
            return Err(SourceError::Empty(self.to_string()));
        }
        tracing::info!(source = %self, count = tasks.len(), "task list loaded");
        Ok(tasks)
    }
}

impl std::fmt::Display for TaskSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskSource::File(path) => write!(f, "{}", path.display()),
            TaskSource::Api(url) => f.write_str(url),
        }
    }
}

async fn fetch_listing(url: &str) -> Result<String, SourceError> {
    let request_err = |e| SourceError::Request(url.to_string(), e);
    let client = reqwest::Client::builder()
        .timeout(SOURCE_TIMEOUT)
        .build()
        .map_err(request_err)?;
    let resp = client.get(url).send().await.map_err(request_err)?;
    if !resp.status().is_success() {
        return Err(SourceError::Status(url.to_string(), resp.status()));
    }
    resp.text().await.map_err(request_err)
}
