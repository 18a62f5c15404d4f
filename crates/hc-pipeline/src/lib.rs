//! hc-pipeline: the cache-aware conversion pipeline.
//!
//! [`Converter`] ties the pieces together: it derives the artifact key from
//! a source URL ([`source`]), short-circuits when the store already holds
//! the manifest, and otherwise runs fetch ([`fetch`]), transcode
//! ([`hc_av::Transcoder`]) and upload ([`hc_store::upload_folder`]) inside a
//! scratch workspace that is always removed afterwards.

pub mod converter;
pub mod fetch;
pub mod source;

pub use converter::{ConversionOutcome, Converter, ConverterSettings, LookupOutcome};
pub use fetch::{Fetcher, HttpFetcher};
pub use source::{SourceRef, SourceRules};
