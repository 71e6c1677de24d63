//! Request pipeline.
//!
//! Each request moves `Parsed -> OriginalCached -> VariantCached -> Served`,
//! or jumps from `Parsed` straight to `Served` when the variant is already
//! cached. Any failure ends in `Failed` and leaves no partial cache entry.

use bytes::Bytes;
use resizr_cache::{CacheKey, CacheTier};
use resizr_core::ports::{CacheStore, OriginFetcher};
use resizr_core::{Error, ResizeRequest, Result, Size, parse_request};
use resizr_transform::ResizeEngine;
use std::fmt;
use std::sync::Arc;
use tracing::{Instrument, debug, info, info_span};

use crate::inflight::KeyLocks;

/// Pipeline state of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Parsed,
    OriginalCached,
    VariantCached,
    Served,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Parsed => "parsed",
            Self::OriginalCached => "original_cached",
            Self::VariantCached => "variant_cached",
            Self::Served => "served",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

impl Stage {
    fn advance(&mut self, next: Stage) {
        debug!(from = %self, to = %next, "Pipeline transition");
        *self = next;
    }
}

/// A response body ready to be written.
#[derive(Debug, Clone)]
pub struct Served {
    pub key: CacheKey,
    pub content_type: &'static str,
    pub body: Bytes,
    /// True when no fetch or resize was needed.
    pub cache_hit: bool,
}

/// Parses requests and keeps both cache tiers filled.
pub struct Pipeline {
    store: Arc<dyn CacheStore>,
    fetcher: Arc<dyn OriginFetcher>,
    engine: Arc<ResizeEngine>,
    original_fills: KeyLocks,
    variant_fills: KeyLocks,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn CacheStore>,
        fetcher: Arc<dyn OriginFetcher>,
        engine: Arc<ResizeEngine>,
    ) -> Self {
        Self {
            store,
            fetcher,
            engine,
            original_fills: KeyLocks::new(),
            variant_fills: KeyLocks::new(),
        }
    }

    /// Fails when the cache store cannot be used.
    pub async fn check_ready(&self) -> Result<()> {
        self.store.check().await
    }

    /// Cache keys currently being filled, across both tiers.
    pub fn fills_in_flight(&self) -> usize {
        self.original_fills.in_flight() + self.variant_fills.in_flight()
    }

    /// Serve the resized image for a request path.
    pub async fn handle(&self, path: &str) -> Result<Served> {
        let request = parse_request(path)?;
        let mut stage = Stage::Parsed;
        let span = info_span!("resize", path = %request.path);

        match self.run(&request, &mut stage).instrument(span).await {
            Ok(served) => Ok(served),
            Err(e) => {
                debug!(path = %request.path, stage = %stage, error = %e, "Pipeline aborted");
                stage.advance(Stage::Failed);
                Err(e)
            }
        }
    }

    async fn run(&self, request: &ResizeRequest, stage: &mut Stage) -> Result<Served> {
        let target = Size::new(request.width, request.height);
        self.engine.check_target(target)?;

        let variant_key = CacheKey::variant(request);
        let format = request.output_format();

        if let Some(body) = self.cached(&variant_key).await? {
            stage.advance(Stage::Served);
            return Ok(self.served(variant_key, format.content_type(), body, true));
        }

        let _fill = self.variant_fills.acquire(&variant_key).await;
        if let Some(body) = self.cached(&variant_key).await? {
            debug!(key = %variant_key, "Variant filled by a concurrent request");
            stage.advance(Stage::Served);
            return Ok(self.served(variant_key, format.content_type(), body, true));
        }

        let original = self.ensure_original(request).await?;
        stage.advance(Stage::OriginalCached);

        let resized = self.engine.resize(original, target, format).await?;
        self.store.write(variant_key.as_str(), &resized).await?;
        stage.advance(Stage::VariantCached);

        info!(
            key = %variant_key,
            tier = %CacheTier::Variant,
            bytes = resized.len(),
            "Cached resized variant"
        );
        stage.advance(Stage::Served);
        Ok(self.served(variant_key, format.content_type(), Bytes::from(resized), false))
    }

    /// Original bytes for `request`, fetching and caching them on a miss.
    async fn ensure_original(&self, request: &ResizeRequest) -> Result<Bytes> {
        let key = CacheKey::original(request);
        if let Some(body) = self.cached(&key).await? {
            return Ok(body);
        }

        let _fill = self.original_fills.acquire(&key).await;
        if let Some(body) = self.cached(&key).await? {
            return Ok(body);
        }

        info!(url = %request.origin_url, key = %key, "Original not cached, fetching");
        let body = self.fetcher.fetch(&request.origin_url).await?;
        self.store.write(key.as_str(), &body).await?;
        info!(key = %key, tier = %CacheTier::Original, bytes = body.len(), "Cached original");
        Ok(body)
    }

    async fn cached(&self, key: &CacheKey) -> Result<Option<Bytes>> {
        if !self.store.exists(key.as_str()).await? {
            return Ok(None);
        }
        match self.store.read(key.as_str()).await {
            Ok(body) => Ok(Some(body)),
            Err(Error::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn served(
        &self,
        key: CacheKey,
        content_type: &'static str,
        body: Bytes,
        cache_hit: bool,
    ) -> Served {
        if let Some(path) = self.store.path(key.as_str()) {
            debug!(key = %key, path = %path.display(), cache_hit, "Serving cache entry");
        }
        Served {
            key,
            content_type,
            body,
            cache_hit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        CountingFetcher, CountingTransformer, MemoryStore, jpeg_image, png_image,
    };
    use resizr_cache::derive_key;
    use std::sync::atomic::Ordering;

    struct Fixture {
        store: Arc<MemoryStore>,
        fetcher: Arc<CountingFetcher>,
        transformer: Arc<CountingTransformer>,
        pipeline: Arc<Pipeline>,
    }

    fn fixture(origin: Option<Vec<u8>>) -> Fixture {
        let store = Arc::new(MemoryStore::default());
        let fetcher = Arc::new(CountingFetcher::new(origin));
        let transformer = Arc::new(CountingTransformer::default());
        let engine = Arc::new(ResizeEngine::new(transformer.clone(), 70));
        let pipeline = Arc::new(Pipeline::new(store.clone(), fetcher.clone(), engine));
        Fixture {
            store,
            fetcher,
            transformer,
            pipeline,
        }
    }

    #[tokio::test]
    async fn test_cold_request_fetches_resizes_and_caches() {
        let f = fixture(Some(png_image(50, 100)));

        let served = f
            .pipeline
            .handle("/100x0/http://host/img.png")
            .await
            .unwrap();

        assert!(!served.cache_hit);
        assert_eq!(served.content_type, "image/png");
        let out = image::load_from_memory(&served.body).unwrap();
        assert_eq!((out.width(), out.height()), (100, 200));

        assert!(f.store.contains(derive_key("http://host/img.png", ".png").as_str()));
        assert!(f.store.contains(derive_key("/100x0/http://host/img.png", ".png").as_str()));
        assert_eq!(f.store.len(), 2);
    }

    #[tokio::test]
    async fn test_second_request_is_served_from_cache() {
        let f = fixture(Some(png_image(40, 40)));

        let first = f.pipeline.handle("/20x20/http://host/a.png").await.unwrap();
        let second = f.pipeline.handle("/20x20/http://host/a.png").await.unwrap();

        assert!(!first.cache_hit);
        assert!(second.cache_hit);
        assert_eq!(first.body, second.body);
        assert_eq!(f.fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(f.transformer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cached_variant_skips_original_tier() {
        let f = fixture(None);
        let variant = derive_key("/10x10/http://host/gone.jpg", ".jpg");
        f.store.insert(variant.as_str(), b"cached jpeg".to_vec());

        let served = f.pipeline.handle("/10x10/http://host/gone.jpg").await.unwrap();

        assert!(served.cache_hit);
        assert_eq!(served.body, Bytes::from_static(b"cached jpeg"));
        assert_eq!(served.content_type, "image/jpeg");
        assert_eq!(f.fetcher.calls.load(Ordering::SeqCst), 0);
        assert_eq!(f.transformer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_two_sizes_share_one_original() {
        let f = fixture(Some(png_image(80, 40)));

        f.pipeline.handle("/40x0/http://host/b.png").await.unwrap();
        f.pipeline.handle("/20x0/http://host/b.png").await.unwrap();

        assert_eq!(f.fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(f.transformer.calls.load(Ordering::SeqCst), 2);
        assert_eq!(f.store.len(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_cold_requests_collapse() {
        let f = fixture(Some(jpeg_image(64, 64)));

        let tasks: Vec<_> = (0..12)
            .map(|_| {
                let pipeline = f.pipeline.clone();
                tokio::spawn(async move { pipeline.handle("/32x16/http://host/c.jpg").await })
            })
            .collect();

        let mut bodies = Vec::new();
        for result in futures::future::join_all(tasks).await {
            bodies.push(result.unwrap().unwrap().body);
        }

        assert!(bodies.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(f.fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(f.transformer.calls.load(Ordering::SeqCst), 1);
        let out = image::load_from_memory(&bodies[0]).unwrap();
        assert_eq!((out.width(), out.height()), (32, 16));
    }

    #[tokio::test]
    async fn test_format_marker_reencodes_as_jpeg() {
        let f = fixture(Some(png_image(30, 30)));

        let served = f
            .pipeline
            .handle("/10x10/jpg/http://host/logo.png")
            .await
            .unwrap();

        assert_eq!(served.content_type, "image/jpeg");
        assert!(served.key.as_str().ends_with(".jpg"));
        assert_eq!(
            image::guess_format(&served.body).unwrap(),
            image::ImageFormat::Jpeg
        );
        assert!(f.store.contains(derive_key("http://host/logo.png", ".png").as_str()));
    }

    #[tokio::test]
    async fn test_fetch_failure_writes_nothing() {
        let f = fixture(None);

        let err = f
            .pipeline
            .handle("/10x10/http://host/missing.jpg")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Fetch(_)));
        assert_eq!(f.store.len(), 0);
        assert_eq!(f.transformer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_undecodable_original_is_cached_but_variant_is_not() {
        let f = fixture(Some(b"<html>not an image</html>".to_vec()));

        let err = f
            .pipeline
            .handle("/10x10/http://host/fake.jpg")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Decode(_)));
        assert!(f.store.contains(derive_key("http://host/fake.jpg", ".jpg").as_str()));
        assert_eq!(f.store.len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_path_touches_nothing() {
        let f = fixture(Some(png_image(10, 10)));

        let err = f.pipeline.handle("/favicon.ico").await.unwrap_err();

        assert!(matches!(err, Error::MalformedRequest(_)));
        assert_eq!(f.fetcher.calls.load(Ordering::SeqCst), 0);
        assert_eq!(f.store.len(), 0);
    }

    #[tokio::test]
    async fn test_oversized_target_is_rejected_before_fetch() {
        let f = fixture(Some(png_image(10, 10)));

        let err = f
            .pipeline
            .handle("/40000x40000/http://host/a.png")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidDimensions { .. }));
        assert_eq!(f.fetcher.calls.load(Ordering::SeqCst), 0);
        assert_eq!(f.store.len(), 0);
    }

    #[tokio::test]
    async fn test_failure_does_not_affect_next_request() {
        let f = fixture(Some(png_image(20, 10)));

        assert!(f.pipeline.handle("/0x0/http://host/d.png").await.is_err());
        let served = f.pipeline.handle("/10x0/http://host/d.png").await.unwrap();

        let out = image::load_from_memory(&served.body).unwrap();
        assert_eq!((out.width(), out.height()), (10, 5));
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::OriginalCached.to_string(), "original_cached");
        assert_eq!(Stage::Failed.to_string(), "failed");
    }
}
