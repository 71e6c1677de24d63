//! In-process test server and its HTTP client.

use resizr_api::{AppState, Pipeline, build_app};
use resizr_cache::FilesystemStore;
use resizr_core::ports::ImageTransformer;
use resizr_core::{OutputFormat, ResizePlan, Result, Size};
use resizr_fetch::{FetchConfig, HttpFetcher};
use resizr_transform::{FirTransformer, ResizeEngine};
use reqwest::{Client, Response};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// [`FirTransformer`] that counts how many images it encoded.
#[derive(Default)]
pub struct CountingTransformer {
    inner: FirTransformer,
    calls: AtomicUsize,
}

impl CountingTransformer {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
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

/// A running server with its own cache directory.
pub struct TestServer {
    pub addr: SocketAddr,
    pub transformer: Arc<CountingTransformer>,
    cache_dir: TempDir,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_with_timeout(Duration::from_secs(5)).await
    }

    pub async fn start_with_timeout(fetch_timeout: Duration) -> anyhow::Result<Self> {
        let cache_dir = tempfile::tempdir()?;
        let transformer = Arc::new(CountingTransformer::default());
        let (addr, handle) =
            start_test_server(cache_dir.path(), transformer.clone(), fetch_timeout).await?;

        Ok(Self {
            addr,
            transformer,
            cache_dir,
            handle,
        })
    }

    pub fn client(&self) -> ResizrClient {
        ResizrClient::new(self.addr)
    }

    pub fn cache_dir(&self) -> &Path {
        self.cache_dir.path()
    }

    /// Names of the files in the cache directory, sorted.
    pub fn cache_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.cache_dir())
            .expect("Failed to read cache dir")
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    pub fn cache_path(&self, name: &str) -> PathBuf {
        self.cache_dir().join(name)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Serve the full app on an ephemeral localhost port.
pub async fn start_test_server(
    cache_dir: &Path,
    transformer: Arc<CountingTransformer>,
    fetch_timeout: Duration,
) -> anyhow::Result<(SocketAddr, tokio::task::JoinHandle<()>)> {
    let store = FilesystemStore::new(cache_dir);
    store.ensure_dir().await?;

    let fetcher = HttpFetcher::new(FetchConfig {
        timeout: fetch_timeout,
        ..Default::default()
    })?;
    let engine = ResizeEngine::new(transformer, 70);
    let pipeline = Pipeline::new(Arc::new(store), Arc::new(fetcher), Arc::new(engine));
    let app = build_app(Arc::new(AppState::new(Arc::new(pipeline))));

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("test server exited: {}", e);
        }
    });

    Ok((addr, handle))
}

/// Client for a [`TestServer`], speaking the resize path grammar.
#[derive(Clone)]
pub struct ResizrClient {
    http: Client,
    base_url: String,
}

impl ResizrClient {
    pub fn new(addr: SocketAddr) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build reqwest client");
        Self {
            http,
            base_url: format!("http://{}", addr),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get(&self, path: &str) -> reqwest::Result<Response> {
        self.http.get(self.url(path)).send().await
    }

    /// GET with one extra request header.
    pub async fn get_with_header(
        &self,
        path: &str,
        name: &str,
        value: &str,
    ) -> reqwest::Result<Response> {
        self.http
            .get(self.url(path))
            .header(name, value)
            .send()
            .await
    }

    /// `GET /{width}x{height}/{origin_url}`
    pub async fn resize(
        &self,
        width: u32,
        height: u32,
        origin_url: &str,
    ) -> reqwest::Result<Response> {
        self.get(&format!("/{}x{}/{}", width, height, origin_url))
            .await
    }

    /// `GET /{width}x{height}/jpg/{origin_url}`
    pub async fn resize_as_jpeg(
        &self,
        width: u32,
        height: u32,
        origin_url: &str,
    ) -> reqwest::Result<Response> {
        self.get(&format!("/{}x{}/jpg/{}", width, height, origin_url))
            .await
    }
}
