//! Source download.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

/// Retrieves a remote resource into a local file.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Download `url` into `destination`, returning the number of bytes
    /// written. `destination` is created or truncated.
    ///
    /// # Errors
    ///
    /// Returns [`hc_core::Error::FetchFailed`] on transport errors, non-2xx
    /// responses, or when the configured size limit is exceeded.
    async fn fetch(&self, url: &str, destination: &Path) -> hc_core::Result<u64>;
}

/// HTTP(S) fetcher built on `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    max_bytes: Option<u64>,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, max_bytes: Option<u64>) -> hc_core::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| hc_core::Error::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, max_bytes })
    }

    pub fn from_config(cfg: &hc_core::config::ConversionConfig) -> hc_core::Result<Self> {
        Self::new(
            Duration::from_secs(cfg.fetch_timeout_secs),
            cfg.max_source_bytes,
        )
    }

    fn check_limit(&self, size: u64) -> hc_core::Result<()> {
        match self.max_bytes {
            Some(limit) if size > limit => Err(hc_core::Error::FetchFailed(format!(
                "source exceeds {limit} bytes"
            ))),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, destination: &Path) -> hc_core::Result<u64> {
        let transport = |e: reqwest::Error| hc_core::Error::FetchFailed(format!("{url}: {e}"));

        let mut response = self.client.get(url).send().await.map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(hc_core::Error::FetchFailed(format!(
                "{url}: HTTP status {status}"
            )));
        }

        if let Some(len) = response.content_length() {
            tracing::debug!("Download size: {len} bytes");
            self.check_limit(len)?;
        }

        let mut file = File::create(destination).await.map_err(|e| {
            hc_core::Error::FetchFailed(format!("cannot create {}: {e}", destination.display()))
        })?;

        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await.map_err(transport)? {
            written += chunk.len() as u64;
            self.check_limit(written)?;
            file.write_all(&chunk).await.map_err(|e| {
                hc_core::Error::FetchFailed(format!("write {}: {e}", destination.display()))
            })?;
        }
        file.flush().await.map_err(|e| {
            hc_core::Error::FetchFailed(format!("write {}: {e}", destination.display()))
        })?;

        tracing::debug!("Fetched {written} bytes from {url}");
        Ok(written)
    }
}
