//! HTTP origin fetcher built on reqwest.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use resizr_core::ports::OriginFetcher;
use resizr_core::{Error, Result};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Fetcher configuration.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Upper bound for a single origin request, body included.
    pub timeout: Duration,
    /// Value sent in the `User-Agent` header.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("resizr/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Fetches originals with a single GET. No retries.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OriginFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes> {
        debug!(url = %url, "Fetching origin image");

        let response = self.client.get(url).send().await.map_err(|e| {
            warn!(url = %url, error = %e, "Origin request failed");
            Error::Fetch(format!("{}: {}", url, e))
        })?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!(url = %url, status = %status, "Origin returned non-200 status");
            return Err(Error::Fetch(format!("{} returned {}", url, status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Fetch(format!("{}: reading body: {}", url, e)))?;

        info!(url = %url, bytes = body.len(), "Fetched origin image");
        Ok(body)
    }
}
