//! Filesystem cache store.

use async_trait::async_trait;
use bytes::Bytes;
use resizr_core::ports::CacheStore;
use resizr_core::{Error, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Flat directory of cache entries, one file per key.
///
/// Writes go to a hidden temp file in the same directory and are renamed into
/// place, so a concurrent reader sees either nothing or the complete entry.
#[derive(Debug, Clone)]
pub struct FilesystemStore {
    root_dir: PathBuf,
}

impl FilesystemStore {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Create the cache directory if it does not exist yet.
    pub async fn ensure_dir(&self) -> Result<()> {
        if tokio::fs::try_exists(&self.root_dir).await? {
            return Ok(());
        }
        debug!(dir = %self.root_dir.display(), "Creating cache directory");
        let mut builder = tokio::fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(0o700);
        builder.create(&self.root_dir).await?;
        Ok(())
    }

    fn key_path(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.starts_with('.') || key.contains(['/', '\\']) {
            return Err(Error::Internal(format!("invalid cache key: {:?}", key)));
        }
        Ok(self.root_dir.join(key))
    }

    fn temp_path(&self, key: &str) -> PathBuf {
        self.root_dir
            .join(format!(".{}.{}.tmp", key, uuid::Uuid::new_v4().simple()))
    }
}

#[async_trait]
impl CacheStore for FilesystemStore {
    async fn check(&self) -> Result<()> {
        let meta = tokio::fs::metadata(&self.root_dir).await?;
        if !meta.is_dir() {
            return Err(Error::Internal(format!(
                "cache root {} is not a directory",
                self.root_dir.display()
            )));
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let path = self.key_path(key)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    async fn read(&self, key: &str) -> Result<Bytes> {
        let path = self.key_path(key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::NotFound(key.to_string())),
            Err(e) => Err(Error::Io(e)),
        }
    }

    async fn write(&self, key: &str, data: &[u8]) -> Result<()> {
        let path = self.key_path(key)?;
        let tmp = self.temp_path(key);

        let written = async {
            let mut file = tokio::fs::File::create(&tmp).await?;
            file.write_all(data).await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&tmp, &path).await
        }
        .await;

        if let Err(e) = written {
            if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
                if cleanup.kind() != ErrorKind::NotFound {
                    warn!(tmp = %tmp.display(), error = %cleanup, "Failed to remove temp file");
                }
            }
            return Err(Error::Io(e));
        }

        debug!(key = %key, bytes = data.len(), "Wrote cache entry");
        Ok(())
    }

    fn path(&self, key: &str) -> Option<PathBuf> {
        self.key_path(key).ok()
    }
}
