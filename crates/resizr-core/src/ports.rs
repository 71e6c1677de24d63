//! Port traits (hexagonal architecture).
//!
//! These traits define the interfaces between the request pipeline and the
//! adapters that store, fetch and transform images.

use crate::format::OutputFormat;
use crate::geometry::{ResizePlan, Size};
use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;

/// Storage for encoded images, addressed by cache key file name.
///
/// Entries are never expired; presence is the only state.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Presence check only. Does not inspect the content.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Read an entry. Fails with [`crate::Error::NotFound`] when absent.
    async fn read(&self, key: &str) -> Result<Bytes>;

    /// Write an entry. Readers never observe a partially written entry.
    async fn write(&self, key: &str, data: &[u8]) -> Result<()>;

    /// Whether the store can currently serve reads and writes.
    async fn check(&self) -> Result<()> {
        Ok(())
    }

    /// Location of the entry on disk, if the store is file backed.
    fn path(&self, _key: &str) -> Option<PathBuf> {
        None
    }
}

/// Retrieves original images from their origin.
#[async_trait]
pub trait OriginFetcher: Send + Sync {
    /// Fetch the bytes at `url`. Any non-200 response is a
    /// [`crate::Error::Fetch`].
    async fn fetch(&self, url: &str) -> Result<Bytes>;
}

/// Decode/crop/scale/encode capability.
///
/// Implementations are called from a blocking thread and are not assumed to
/// be safe for concurrent use; the resize engine serializes calls.
pub trait ImageTransformer: Send + Sync {
    /// Dimensions of the encoded image in `source`.
    fn source_size(&self, source: &[u8]) -> Result<Size>;

    /// Apply `plan` to `source` and encode the result as `format`.
    /// `quality` applies to lossy formats only.
    fn apply(
        &self,
        source: &[u8],
        plan: &ResizePlan,
        format: OutputFormat,
        quality: u8,
    ) -> Result<Vec<u8>>;
}
