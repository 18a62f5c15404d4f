//! hc-core: shared error type and application configuration.
//!
//! Every other hc-* crate depends on this one for [`Error`], the
//! [`Result`] alias and the [`config::Config`] tree loaded at startup.

pub mod config;
pub mod error;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
