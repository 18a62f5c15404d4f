//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries the
//! server, object store, tool and conversion sections. Every section
//! defaults sensibly so a completely empty `{}` file is valid. Credentials
//! and domain constants live here and are handed to the components that
//! need them at construction time; nothing reads them from globals later.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::Error;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub tools: ToolsConfig,
    pub conversion: ConversionConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str).map_err(|e| Error::Config(format!("parse error: {e}")))
    }

    /// Load configuration from a file, failing if it is missing or invalid.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_json(&contents)
    }

    /// The config file (when given and present) with environment overrides
    /// applied on top. An unreadable or unparsable file is logged and
    /// replaced by defaults so the service can still start.
    pub fn resolve(path: Option<&Path>, env: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = match path {
            Some(p) if p.exists() => Self::load(p).unwrap_or_else(|e| {
                tracing::warn!("{e}; using defaults");
                Self::default()
            }),
            Some(p) => {
                tracing::info!("No config file at {}; using defaults", p.display());
                Self::default()
            }
            None => Self::default(),
        };
        config.apply_env(env);
        config
    }

    /// Apply environment overrides on top of the loaded file.
    ///
    /// `lookup` is normally `|k| std::env::var(k).ok()`; tests pass a map.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(region) = lookup("AWS_REGION") {
            self.store.region = region;
        }
        if let Some(bucket) = lookup("HLSCACHE_BUCKET") {
            self.store.bucket = bucket;
        }
        if let Some(domain) = lookup("CLOUDFRONT_DOMAIN") {
            self.store.cdn_domain = domain;
        }
        if let Some(port) = lookup("HLSCACHE_PORT") {
            match port.parse() {
                Ok(p) => self.server.port = p,
                Err(_) => tracing::warn!("Ignoring HLSCACHE_PORT={port}: not a port number"),
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }
        if self.store.bucket.is_empty() {
            warnings.push("store.bucket is empty".into());
        }
        if self.store.cdn_domain.is_empty() {
            warnings.push(
                "store.cdn_domain is empty; stream URLs will be relative".into(),
            );
        }
        if self.store.access_key_id.is_some() != self.store.secret_access_key.is_some() {
            warnings.push(
                "store credentials are incomplete; falling back to the default provider chain"
                    .into(),
            );
        }
        if self.conversion.segment_duration_secs == 0 {
            warnings.push("conversion.segment_duration_secs is 0".into());
        }
        if self.conversion.source_extension.is_empty() {
            warnings.push("conversion.source_extension is empty".into());
        }
        if self.conversion.max_source_bytes == Some(0) {
            warnings.push("conversion.max_source_bytes is 0; every fetch will fail".into());
        }

        warnings
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
        }
    }
}

/// Object store and delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Bucket that receives manifests and segments.
    pub bucket: String,
    pub region: String,
    /// Custom S3 endpoint (MinIO and friends); path-style addressing is used
    /// when set.
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Key prefix for uploaded artifacts; empty means the bucket root.
    pub key_prefix: String,
    /// Public content-delivery domain, e.g. `https://d111.cloudfront.net`.
    pub cdn_domain: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            bucket: "zidit".into(),
            region: "us-east-1".into(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            key_prefix: String::new(),
            cdn_domain: String::new(),
        }
    }
}

/// Paths to external CLI tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
}

/// Conversion pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Accepted source extension, without the dot.
    pub source_extension: String,
    /// Manifest extension, without the dot.
    pub manifest_extension: String,
    /// Filename suffixes stripped from the stem before naming artifacts
    /// (e.g. `-mobile` so `clip-mobile.mp4` and `clip.mp4` share a key).
    pub alternate_suffixes: Vec<String>,
    pub segment_duration_secs: u32,
    pub transcode_timeout_secs: u64,
    pub fetch_timeout_secs: u64,
    /// Upper bound on the downloaded source size; `None` is unbounded.
    pub max_source_bytes: Option<u64>,
    /// Root for scratch workspaces; `None` uses `<system temp>/hlscache`.
    pub scratch_dir: Option<PathBuf>,
    /// Serialize concurrent conversions of the same artifact key in-process.
    pub dedupe_in_flight: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            source_extension: "mp4".into(),
            manifest_extension: "m3u8".into(),
            alternate_suffixes: vec!["-mobile".into()],
            segment_duration_secs: 10,
            transcode_timeout_secs: 600,
            fetch_timeout_secs: 300,
            max_source_bytes: None,
            scratch_dir: None,
            dedupe_in_flight: true,
        }
    }
}

impl ConversionConfig {
    /// Resolve the scratch root, defaulting to `<system temp>/hlscache`.
    pub fn scratch_root(&self) -> PathBuf {
        self.scratch_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("hlscache"))
    }
}
