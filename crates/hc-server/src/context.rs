//! Application context shared across route handlers via Axum state.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use hc_av::{FfmpegTranscoder, HlsSettings, ScratchSpace, ToolRegistry};
use hc_core::config::Config;
use hc_pipeline::{Converter, ConverterSettings, HttpFetcher};
use hc_store::{ArtifactStore, S3ArtifactStore};

/// Central state cloned into every handler.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub converter: Arc<Converter>,
    /// Prometheus render handle; `None` when no recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppContext {
    pub fn new(config: Config, converter: Converter) -> Self {
        Self {
            config: Arc::new(config),
            converter: Arc::new(converter),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Build the production converter: HTTP fetcher, ffmpeg and S3.
pub async fn build_converter(
    config: &Config,
    tools: &ToolRegistry,
) -> hc_core::Result<Converter> {
    let store = Arc::new(S3ArtifactStore::from_config(&config.store).await);
    build_converter_with_store(config, tools, store)
}

/// Build a converter around an arbitrary artifact store.
pub fn build_converter_with_store(
    config: &Config,
    tools: &ToolRegistry,
    store: Arc<dyn ArtifactStore>,
) -> hc_core::Result<Converter> {
    let transcoder =
        FfmpegTranscoder::from_registry(tools, HlsSettings::from_config(&config.conversion));
    let fetcher = HttpFetcher::from_config(&config.conversion)?;

    Ok(Converter::new(
        ConverterSettings::from_config(config)?,
        Arc::new(fetcher),
        Arc::new(transcoder),
        store,
        ScratchSpace::new(config.conversion.scratch_root()),
    ))
}
