//! Speed sink: a single file holding the latest speed sample.
//!
//! The sampler overwrites it every tick; the engine appends the run summary
//! once at shutdown. Both go through the same mutex.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs::File;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct SpeedSink {
    path: PathBuf,
    file: Arc<Mutex<File>>,
}

impl SpeedSink {
    /// Create (or truncate) the sink file.
    pub async fn create(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).await?;
        Ok(Self {
            path,
            file: Arc::new(Mutex::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the whole file with `content` and sync it to disk.
    pub async fn overwrite(&self, content: &str) -> std::io::Result<()> {
        let mut file = self.file.lock().await;
        file.seek(SeekFrom::Start(0)).await?;
        file.set_len(0).await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;
        file.sync_data().await
    }

    /// Append `content` after whatever is in the file and sync it to disk.
    pub async fn append(&self, content: &str) -> std::io::Result<()> {
        let mut file = self.file.lock().await;
        file.seek(SeekFrom::End(0)).await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;
        file.sync_data().await
    }
}
