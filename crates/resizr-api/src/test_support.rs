//! In-memory adapters for pipeline and handler tests.

use async_trait::async_trait;
use bytes::Bytes;
use image::{ImageFormat, Rgb, RgbImage};
use resizr_core::ports::{CacheStore, ImageTransformer, OriginFetcher};
use resizr_core::{Error, OutputFormat, ResizePlan, Result, Size};
use resizr_transform::FirTransformer;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Bytes>>,
}

impl MemoryStore {
    pub fn insert(&self, key: &str, data: Vec<u8>) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), Bytes::from(data));
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.contains(key))
    }

    async fn read(&self, key: &str) -> Result<Bytes> {
        self.entries
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| Error::NotFound(key.to_string()))
    }

    async fn write(&self, key: &str, data: &[u8]) -> Result<()> {
        self.insert(key, data.to_vec());
        Ok(())
    }
}

/// Serves a fixed body for every URL, or fails when there is none.
pub struct CountingFetcher {
    body: Option<Vec<u8>>,
    pub calls: AtomicUsize,
}

impl CountingFetcher {
    pub fn new(body: Option<Vec<u8>>) -> Self {
        Self {
            body,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl OriginFetcher for CountingFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;
        match &self.body {
            Some(body) => Ok(Bytes::from(body.clone())),
            None => Err(Error::Fetch(format!("{} returned 404 Not Found", url))),
        }
    }
}

/// [`FirTransformer`] that counts `apply` calls.
#[derive(Default)]
pub struct CountingTransformer {
    inner: FirTransformer,
    pub calls: AtomicUsize,
}

impl ImageTransformer for CountingTransformer {
    fn source_size(&self, source: &[u8]) -> Result<Size> {
        self.inner.source_size(source)
    }

    fn apply(
        &self,
        source: &[u8],
        plan: &ResizePlan,
        format: OutputFormat,
        quality: u8,
    ) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.apply(source, plan, format, quality)
    }
}

fn encoded(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

pub fn png_image(width: u32, height: u32) -> Vec<u8> {
    encoded(width, height, ImageFormat::Png)
}

pub fn jpeg_image(width: u32, height: u32) -> Vec<u8> {
    encoded(width, height, ImageFormat::Jpeg)
}
