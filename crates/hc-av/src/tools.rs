//! Locating the ffmpeg binary.
//!
//! Discovery runs once at startup. A configured path wins when it exists,
//! otherwise `PATH` is searched. A missing encoder is reported but does not
//! stop the service, since cached artifacts can still be served.

use std::path::{Path, PathBuf};

const FFMPEG: &str = "ffmpeg";

/// Availability of one external tool, for startup logs and `check-tools`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInfo {
    pub name: String,
    pub available: bool,
    /// Version token from the `-version` banner, if the tool ran.
    pub version: Option<String>,
    pub path: Option<PathBuf>,
}

/// Where the encoder lives, if anywhere.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    ffmpeg: Option<PathBuf>,
}

impl ToolRegistry {
    pub fn discover(tools_config: &hc_core::config::ToolsConfig) -> Self {
        let ffmpeg = match tools_config.ffmpeg_path.as_deref() {
            Some(p) if p.exists() => Some(p.to_path_buf()),
            Some(p) => {
                tracing::warn!(
                    "Configured ffmpeg_path {} does not exist; searching PATH",
                    p.display()
                );
                which::which(FFMPEG).ok()
            }
            None => which::which(FFMPEG).ok(),
        };
        Self { ffmpeg }
    }

    /// Pin the encoder path without touching the filesystem.
    pub fn with_ffmpeg(path: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: Some(path.into()),
        }
    }

    pub fn ffmpeg(&self) -> hc_core::Result<&Path> {
        self.ffmpeg.as_deref().ok_or_else(|| {
            hc_core::Error::tool(FFMPEG, "not found; install it or set tools.ffmpeg_path")
        })
    }

    /// Probe every managed tool.
    pub fn check_all(&self) -> Vec<ToolInfo> {
        let info = match &self.ffmpeg {
            Some(path) => ToolInfo {
                name: FFMPEG.to_string(),
                available: true,
                version: probe_version(path),
                path: Some(path.clone()),
            },
            None => ToolInfo {
                name: FFMPEG.to_string(),
                available: false,
                version: None,
                path: None,
            },
        };
        vec![info]
    }
}

fn probe_version(path: &Path) -> Option<String> {
    let output = std::process::Command::new(path)
        .arg("-version")
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout.lines().next().map(banner_version)
}

/// `ffmpeg version 6.1.1-3ubuntu5 Copyright ...` -> `6.1.1-3ubuntu5`.
/// Banners that do not follow that shape are returned whole.
fn banner_version(line: &str) -> String {
    let mut words = line.split_whitespace();
    match (words.next(), words.next(), words.next()) {
        (Some(_), Some("version"), Some(v)) => v.to_string(),
        _ => line.trim().to_string(),
    }
}
