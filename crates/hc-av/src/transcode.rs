//! MP4 to HLS segmentation using ffmpeg with stream copy.
//!
//! The segmenter itself is ffmpeg; this module owns only the invocation
//! contract: argument construction, working directory and failure capture.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use crate::command::ToolCommand;
use crate::tools::ToolRegistry;

/// Converts a local media file into a manifest plus numbered segments.
///
/// Implementations must be safe to share across request tasks.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Short name for logs (e.g. "ffmpeg").
    fn name(&self) -> &'static str;

    /// Segment `input` into `output_dir`, producing `<base_name>.<manifest>`
    /// and `<base_name>N.ts` files.
    ///
    /// # Errors
    ///
    /// Returns [`hc_core::Error::TranscodeFailed`] carrying the encoder's
    /// diagnostic output on failure.
    async fn transcode(
        &self,
        input: &Path,
        output_dir: &Path,
        base_name: &str,
    ) -> hc_core::Result<()>;
}

/// Segmenting parameters.
#[derive(Debug, Clone)]
pub struct HlsSettings {
    /// Target duration of each segment in seconds.
    pub segment_duration_secs: u32,
    /// Manifest extension without the dot.
    pub manifest_extension: String,
    /// Kill the encoder after this long.
    pub timeout: Duration,
}

impl HlsSettings {
    pub fn from_config(cfg: &hc_core::config::ConversionConfig) -> Self {
        Self {
            segment_duration_secs: cfg.segment_duration_secs,
            manifest_extension: cfg.manifest_extension.clone(),
            timeout: Duration::from_secs(cfg.transcode_timeout_secs),
        }
    }

    /// Manifest path for `base_name` inside `output_dir`.
    pub fn manifest_path(&self, output_dir: &Path, base_name: &str) -> PathBuf {
        output_dir.join(format!("{base_name}.{}", self.manifest_extension))
    }
}

impl Default for HlsSettings {
    fn default() -> Self {
        Self::from_config(&hc_core::config::ConversionConfig::default())
    }
}

/// Build the ffmpeg argument list: stream copy, fixed segment duration,
/// unbounded playlist, HLS muxer writing into `output_dir`.
pub fn hls_args(
    input: &Path,
    output_dir: &Path,
    base_name: &str,
    settings: &HlsSettings,
) -> Vec<String> {
    let segment_pattern = output_dir.join(format!("{base_name}%d.ts"));
    let manifest = settings.manifest_path(output_dir, base_name);

    vec![
        "-y".into(),
        "-i".into(),
        input.to_string_lossy().to_string(),
        "-codec:".into(),
        "copy".into(),
        "-start_number".into(),
        "0".into(),
        "-hls_time".into(),
        settings.segment_duration_secs.to_string(),
        "-hls_list_size".into(),
        "0".into(),
        "-hls_segment_filename".into(),
        segment_pattern.to_string_lossy().to_string(),
        "-f".into(),
        "hls".into(),
        manifest.to_string_lossy().to_string(),
    ]
}

/// [`Transcoder`] that shells out to ffmpeg.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: PathBuf,
    settings: HlsSettings,
}

impl FfmpegTranscoder {
    /// Use an explicit ffmpeg binary.
    pub fn new(program: impl Into<PathBuf>, settings: HlsSettings) -> Self {
        Self {
            program: program.into(),
            settings,
        }
    }

    /// Use the ffmpeg found by the registry.
    ///
    /// A missing ffmpeg does not prevent startup (cached artifacts can still
    /// be served); the bare name is used and conversions fail at spawn time.
    pub fn from_registry(tools: &ToolRegistry, settings: HlsSettings) -> Self {
        let program = match tools.ffmpeg() {
            Ok(path) => path.to_path_buf(),
            Err(e) => {
                tracing::warn!("{e}; conversions will fail until it is installed");
                PathBuf::from("ffmpeg")
            }
        };
        Self::new(program, settings)
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    async fn transcode(
        &self,
        input: &Path,
        output_dir: &Path,
        base_name: &str,
    ) -> hc_core::Result<()> {
        tracing::info!(
            "HLS segment: {:?} -> {:?} (segment_duration={}s)",
            input,
            output_dir,
            self.settings.segment_duration_secs
        );

        let mut cmd = ToolCommand::new(self.program.clone());
        cmd.timeout(self.settings.timeout);
        cmd.current_dir(output_dir);
        cmd.args(hls_args(input, output_dir, base_name, &self.settings));

        cmd.execute().await.map_err(|e| match e {
            hc_core::Error::Tool { message, .. } => hc_core::Error::TranscodeFailed(message),
            other => hc_core::Error::TranscodeFailed(other.to_string()),
        })?;

        let manifest = self.settings.manifest_path(output_dir, base_name);
        if !manifest.is_file() {
            return Err(hc_core::Error::TranscodeFailed(format!(
                "encoder exited cleanly but wrote no manifest at {}",
                manifest.display()
            )));
        }

        Ok(())
    }
}
