//! Cache-aware conversion orchestration.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use tokio::sync::{Mutex, MutexGuard};

use hc_av::{ScratchSpace, ScratchWorkspace, Transcoder};
use hc_core::config::Config;
use hc_store::{upload_folder, ArtifactStore};

use crate::fetch::Fetcher;
use crate::source::{SourceRef, SourceRules};

/// Result of [`Converter::convert`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOutcome {
    pub stream_url: String,
    pub artifact_key: String,
    /// `true` when the artifact already existed and nothing was converted.
    pub cached: bool,
}

/// Result of [`Converter::lookup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupOutcome {
    pub stream_url: String,
    pub artifact_key: String,
    pub exists: bool,
}

/// Static parameters of a [`Converter`].
#[derive(Debug, Clone)]
pub struct ConverterSettings {
    pub bucket: String,
    pub dedupe_in_flight: bool,
    pub rules: SourceRules,
}

impl ConverterSettings {
    pub fn from_config(config: &Config) -> hc_core::Result<Self> {
        Ok(Self {
            bucket: config.store.bucket.clone(),
            dedupe_in_flight: config.conversion.dedupe_in_flight,
            rules: SourceRules::new(&config.conversion, &config.store)?,
        })
    }
}

/// Converts source MP4 URLs into published HLS artifacts, reusing artifacts
/// that already exist in the store.
pub struct Converter {
    settings: ConverterSettings,
    fetcher: Arc<dyn Fetcher>,
    transcoder: Arc<dyn Transcoder>,
    store: Arc<dyn ArtifactStore>,
    scratch: ScratchSpace,
    in_flight: InFlight,
}

impl Converter {
    pub fn new(
        settings: ConverterSettings,
        fetcher: Arc<dyn Fetcher>,
        transcoder: Arc<dyn Transcoder>,
        store: Arc<dyn ArtifactStore>,
        scratch: ScratchSpace,
    ) -> Self {
        Self {
            settings,
            fetcher,
            transcoder,
            store,
            scratch,
            in_flight: InFlight::default(),
        }
    }

    pub fn settings(&self) -> &ConverterSettings {
        &self.settings
    }

    pub fn store_name(&self) -> &'static str {
        self.store.name()
    }

    pub fn transcoder_name(&self) -> &'static str {
        self.transcoder.name()
    }

    /// Return the stream URL for `url`, converting and publishing it first
    /// if the artifact does not exist yet.
    ///
    /// # Errors
    ///
    /// - [`hc_core::Error::InvalidInput`] for a malformed URL.
    /// - [`hc_core::Error::ConversionFailed`] wrapping the first failing
    ///   step (existence check, fetch, transcode, upload).
    pub async fn convert(&self, url: &str) -> hc_core::Result<ConversionOutcome> {
        let started = Instant::now();
        let result = self.convert_inner(url).await;

        let outcome = match &result {
            Ok(o) if o.cached => Some("cached"),
            Ok(_) => Some("converted"),
            Err(hc_core::Error::InvalidInput(_)) => None,
            Err(_) => Some("failed"),
        };
        if let Some(outcome) = outcome {
            metrics::counter!("hlscache_conversions_total", "outcome" => outcome).increment(1);
            if outcome != "cached" {
                metrics::histogram!("hlscache_conversion_seconds")
                    .record(started.elapsed().as_secs_f64());
            }
        }

        result
    }

    /// Validate `url` and report whether its artifact exists, without
    /// converting anything.
    pub async fn lookup(&self, url: &str) -> hc_core::Result<LookupOutcome> {
        let source = self.settings.rules.parse(url)?;
        let exists = self.exists(&source).await?;
        Ok(LookupOutcome {
            stream_url: source.stream_url,
            artifact_key: source.artifact_key,
            exists,
        })
    }

    async fn convert_inner(&self, url: &str) -> hc_core::Result<ConversionOutcome> {
        let source = self.settings.rules.parse(url)?;
        tracing::info!("Converting {} (key {})", source.url, source.artifact_key);

        if self.exists(&source).await.map_err(hc_core::Error::conversion)? {
            tracing::info!("Artifact {} already exists", source.artifact_key);
            return Ok(Self::outcome(source, true));
        }

        let lease = self
            .settings
            .dedupe_in_flight
            .then(|| self.in_flight.register(&source.artifact_key));
        let _turn = match &lease {
            Some(lease) => Some(lease.wait().await),
            None => None,
        };
        // Another task may have published it while we waited.
        if lease.is_some() && self.exists(&source).await.map_err(hc_core::Error::conversion)? {
            tracing::info!(
                "Artifact {} was published while waiting",
                source.artifact_key
            );
            return Ok(Self::outcome(source, true));
        }

        self.run_pipeline(&source)
            .await
            .map_err(hc_core::Error::conversion)?;

        tracing::info!("Conversion complete: {}", source.stream_url);
        Ok(Self::outcome(source, false))
    }

    async fn exists(&self, source: &SourceRef) -> hc_core::Result<bool> {
        self.store
            .exists(&self.settings.bucket, &source.artifact_key)
            .await
    }

    /// Allocate a workspace, run the steps in it, then remove it whatever
    /// the steps returned.
    async fn run_pipeline(&self, source: &SourceRef) -> hc_core::Result<()> {
        let workspace = self.scratch.allocate()?;
        tracing::info!("[1/5] Created workspace {}", workspace.path().display());

        let result = self.run_steps(&workspace, source).await;

        tracing::info!("[5/5] Cleaning up {}", workspace.path().display());
        settle(result, workspace.release())
    }

    async fn run_steps(
        &self,
        workspace: &ScratchWorkspace,
        source: &SourceRef,
    ) -> hc_core::Result<()> {
        let rules = &self.settings.rules;
        let input = workspace.file(&format!(
            "{}.{}",
            source.base_name,
            rules.source_extension()
        ));

        tracing::info!("[2/5] Downloading {}", source.url);
        let bytes = self.fetcher.fetch(&source.url, &input).await?;
        tracing::debug!("Downloaded {bytes} bytes to {}", input.display());

        tracing::info!("[3/5] Transcoding with {}", self.transcoder.name());
        self.transcoder
            .transcode(&input, workspace.path(), &source.base_name)
            .await?;

        tracing::info!(
            "[4/5] Uploading to {} bucket {}",
            self.store.name(),
            self.settings.bucket
        );
        let keys = upload_folder(
            self.store.as_ref(),
            workspace.path(),
            &self.settings.bucket,
            rules.key_prefix(),
            rules.source_extension(),
            rules.manifest_extension(),
        )
        .await?;
        tracing::debug!("Uploaded {} objects", keys.len());

        Ok(())
    }

    fn outcome(source: SourceRef, cached: bool) -> ConversionOutcome {
        ConversionOutcome {
            stream_url: source.stream_url,
            artifact_key: source.artifact_key,
            cached,
        }
    }
}

/// Combine the pipeline result with the workspace cleanup result. A
/// cleanup failure is only logged: the step error wins when there is one,
/// and a published artifact stays a success.
fn settle(result: hc_core::Result<()>, cleanup: hc_core::Result<()>) -> hc_core::Result<()> {
    if let Err(e) = cleanup {
        match &result {
            Ok(()) => tracing::warn!("Workspace cleanup failed after upload: {e}"),
            Err(_) => tracing::warn!("Workspace cleanup failed: {e}"),
        }
    }
    result
}

/// Per-key async locks serializing conversions of the same artifact.
#[derive(Default)]
struct InFlight {
    keys: DashMap<String, Arc<Mutex<()>>>,
}

impl InFlight {
    /// Join the queue for `key`. The entry lives as long as any lease for
    /// the key does, whether or not that lease ever got its turn.
    fn register(&self, key: &str) -> Lease<'_> {
        let lock = self.keys.entry(key.to_string()).or_default().clone();
        Lease {
            keys: &self.keys,
            key: key.to_string(),
            lock,
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.keys.len()
    }
}

/// A place in the queue for one artifact key.
struct Lease<'a> {
    keys: &'a DashMap<String, Arc<Mutex<()>>>,
    key: String,
    lock: Arc<Mutex<()>>,
}

impl Lease<'_> {
    /// Wait until every earlier holder of the key is done.
    async fn wait(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().await
    }
}

impl Drop for Lease<'_> {
    fn drop(&mut self) {
        // Two references left means the map's and this lease's.
        self.keys
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 2);
    }
}
