//! Shared test harness for integration tests.
//!
//! [`TestHarness`] builds a full [`AppContext`] around recording fakes: a
//! fetcher that writes a stub source file, a transcoder that writes a
//! manifest plus segments, and the in-memory artifact store. Scratch
//! workspaces go to a per-harness temp directory so tests can assert that
//! nothing is left behind. [`TestHarness::serve`] starts Axum on a random
//! port for HTTP-level testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;

use hc_av::{ScratchSpace, Transcoder};
use hc_core::config::Config;
use hc_pipeline::{Converter, ConverterSettings, Fetcher};
use hc_server::context::AppContext;
use hc_server::router::build_router;
use hc_store::{ArtifactStore, MemoryArtifactStore};

pub const CDN: &str = "https://d111.cloudfront.net";
pub const BUCKET: &str = "zidit";

/// Fetcher that records calls and writes a few bytes to the destination.
#[derive(Default)]
pub struct FakeFetcher {
    pub calls: AtomicUsize,
}

impl FakeFetcher {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, _url: &str, destination: &Path) -> hc_core::Result<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::fs::write(destination, b"not really an mp4").await?;
        Ok(17)
    }
}

/// Transcoder that records calls and writes `<base>.m3u8` plus two segments.
#[derive(Default)]
pub struct FakeTranscoder {
    pub calls: AtomicUsize,
}

impl FakeTranscoder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn transcode(
        &self,
        _input: &Path,
        output_dir: &Path,
        base_name: &str,
    ) -> hc_core::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::fs::write(
            output_dir.join(format!("{base_name}.m3u8")),
            "#EXTM3U\n#EXT-X-ENDLIST\n",
        )?;
        std::fs::write(output_dir.join(format!("{base_name}0.ts")), b"seg0")?;
        std::fs::write(output_dir.join(format!("{base_name}1.ts")), b"seg1")?;
        Ok(())
    }
}

/// Test harness wrapping a fully constructed [`AppContext`].
pub struct TestHarness {
    pub ctx: AppContext,
    pub store: Arc<MemoryArtifactStore>,
    pub fetcher: Arc<FakeFetcher>,
    pub transcoder: Arc<FakeTranscoder>,
    pub scratch: TempDir,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::build(None, None)
    }

    /// Harness whose conversions go through `transcoder` instead of the
    /// recording fake.
    pub fn with_transcoder(transcoder: Arc<dyn Transcoder>) -> Self {
        Self::build(Some(transcoder), None)
    }

    /// Harness whose conversions download with `fetcher`.
    pub fn with_fetcher(fetcher: Arc<dyn Fetcher>, transcoder: Arc<dyn Transcoder>) -> Self {
        Self::build(Some(transcoder), Some(fetcher))
    }

    fn build(transcoder: Option<Arc<dyn Transcoder>>, fetcher: Option<Arc<dyn Fetcher>>) -> Self {
        let scratch = tempfile::tempdir().expect("failed to create scratch root");
        let config = test_config(scratch.path());

        let store = Arc::new(MemoryArtifactStore::new());
        let fake_fetcher = Arc::new(FakeFetcher::default());
        let fake_transcoder = Arc::new(FakeTranscoder::default());

        let converter = Converter::new(
            ConverterSettings::from_config(&config).expect("invalid test config"),
            fetcher.unwrap_or_else(|| fake_fetcher.clone() as Arc<dyn Fetcher>),
            transcoder.unwrap_or_else(|| fake_transcoder.clone() as Arc<dyn Transcoder>),
            store.clone() as Arc<dyn ArtifactStore>,
            ScratchSpace::new(config.conversion.scratch_root()),
        );

        Self {
            ctx: AppContext::new(config, converter),
            store,
            fetcher: fake_fetcher,
            transcoder: fake_transcoder,
            scratch,
        }
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn serve(self) -> (Self, SocketAddr) {
        let app = build_router(self.ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (self, addr)
    }

    pub async fn with_server() -> (Self, SocketAddr) {
        Self::new().serve().await
    }

    /// Mark `key` as already published.
    pub fn publish(&self, key: &str) {
        self.store.insert(BUCKET, key, "application/vnd.apple.mpegurl");
    }

    /// Whether the scratch root holds no leftover workspaces.
    pub fn scratch_is_empty(&self) -> bool {
        match std::fs::read_dir(self.scratch.path()) {
            Ok(mut entries) => entries.next().is_none(),
            Err(_) => true,
        }
    }
}

pub fn test_config(scratch_root: &Path) -> Config {
    let mut config = Config::default();
    config.store.bucket = BUCKET.into();
    config.store.cdn_domain = format!("{CDN}/");
    config.conversion.scratch_dir = Some(scratch_root.to_path_buf());
    config
}

/// POST `{"videoUrl": url}` to the cache endpoint.
pub async fn post_cache(addr: SocketAddr, body: serde_json::Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("http://{addr}/api/cache"))
        .json(&body)
        .send()
        .await
        .expect("request failed")
}

/// Write an executable shell script standing in for ffmpeg.
#[cfg(unix)]
pub fn fake_ffmpeg(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join("ffmpeg");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("failed to write script");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("failed to chmod script");
    path
}
