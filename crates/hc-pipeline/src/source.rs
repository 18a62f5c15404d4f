//! Source URL validation and artifact naming.
//!
//! Everything derived here is a pure function of the URL and the
//! configuration, so two requests for the same source (modulo a stripped
//! alternate-quality suffix) always land on the same artifact key.

use regex::Regex;

use hc_core::config::{ConversionConfig, StoreConfig};

/// A validated source URL together with every name derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRef {
    pub url: String,
    /// File stem with the extension and any alternate suffix removed.
    pub base_name: String,
    /// Remote key of the manifest, e.g. `clip.m3u8` or `hls/clip.m3u8`.
    pub artifact_key: String,
    /// Public URL of the manifest.
    pub stream_url: String,
}

/// Naming rules compiled once from configuration.
#[derive(Debug, Clone)]
pub struct SourceRules {
    source_extension: String,
    manifest_extension: String,
    key_prefix: String,
    cdn_domain: String,
    pattern: Regex,
}

impl SourceRules {
    pub fn new(conversion: &ConversionConfig, store: &StoreConfig) -> hc_core::Result<Self> {
        let ext = regex::escape(&conversion.source_extension);
        let suffixes: Vec<String> = conversion
            .alternate_suffixes
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| regex::escape(s))
            .collect();

        // The stem is lazy so an alternate suffix is stripped when present.
        let pattern = if suffixes.is_empty() {
            format!(r"/([^/]+?)\.{ext}$")
        } else {
            format!(r"/([^/]+?)(?:{})?\.{ext}$", suffixes.join("|"))
        };
        let pattern = Regex::new(&pattern)
            .map_err(|e| hc_core::Error::Config(format!("invalid source pattern: {e}")))?;

        Ok(Self {
            source_extension: conversion.source_extension.clone(),
            manifest_extension: conversion.manifest_extension.clone(),
            key_prefix: store.key_prefix.trim_matches('/').to_string(),
            cdn_domain: store.cdn_domain.trim_end_matches('/').to_string(),
            pattern,
        })
    }

    pub fn source_extension(&self) -> &str {
        &self.source_extension
    }

    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    pub fn manifest_extension(&self) -> &str {
        &self.manifest_extension
    }

    /// Validate `url` and derive its base name, artifact key and stream URL.
    ///
    /// # Errors
    ///
    /// [`hc_core::Error::InvalidInput`] when the URL is empty, does not end
    /// in the source extension, or has no usable file name.
    pub fn parse(&self, url: &str) -> hc_core::Result<SourceRef> {
        let suffix = format!(".{}", self.source_extension);
        if url.trim().is_empty() || !url.ends_with(&suffix) {
            return Err(hc_core::Error::InvalidInput(format!(
                "Invalid {} URL",
                self.source_extension.to_uppercase()
            )));
        }

        let base_name = self
            .pattern
            .captures(url)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| {
                hc_core::Error::InvalidInput("Cannot extract name from URL".into())
            })?;

        let manifest = format!("{base_name}.{}", self.manifest_extension);
        let artifact_key = if self.key_prefix.is_empty() {
            manifest
        } else {
            format!("{}/{manifest}", self.key_prefix)
        };
        let stream_url = format!("{}/{artifact_key}", self.cdn_domain);

        Ok(SourceRef {
            url: url.to_string(),
            base_name,
            artifact_key,
            stream_url,
        })
    }
}
