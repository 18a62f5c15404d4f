//! Unified error type for hlscache.
//!
//! All crates funnel their failures into [`Error`], which carries enough
//! context for the HTTP layer to pick a status code via [`Error::http_status`]
//! and a response body via [`Error::details`].

use std::path::PathBuf;

/// Unified error type covering every failure mode of a conversion.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The caller supplied a missing or malformed source URL.
    #[error("{0}")]
    InvalidInput(String),

    /// Downloading the source resource failed.
    #[error("Fetch failed: {0}")]
    FetchFailed(String),

    /// The external encoder failed or produced no manifest.
    #[error("Transcode failed: {0}")]
    TranscodeFailed(String),

    /// An object store operation failed (anything other than "not found").
    #[error("Store error: {0}")]
    Store(String),

    /// Removing a scratch workspace failed for a reason other than it being
    /// already gone.
    #[error("Cleanup failed for {}: {source}", path.display())]
    CleanupFailed {
        /// Workspace that could not be removed.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A pipeline step failed; wraps the step's own error.
    #[error("Conversion failed: {source}")]
    ConversionFailed {
        /// The failing step's error.
        source: Box<Error>,
    },

    /// An external tool could not be spawned, timed out, or exited non-zero.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description, including trimmed stderr.
        message: String,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The configuration could not be read or parsed.
    #[error("Config error: {0}")]
    Config(String),

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an HTTP status code.
    ///
    /// Only input validation is the caller's fault; every pipeline failure
    /// is reported as 500.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::InvalidInput(_) => 400,
            _ => 500,
        }
    }

    /// Short machine-readable code, used in logs and metrics labels.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "invalid_input",
            Error::FetchFailed(_) => "fetch_failed",
            Error::TranscodeFailed(_) => "transcode_failed",
            Error::Store(_) => "store_error",
            Error::CleanupFailed { .. } => "cleanup_failed",
            Error::ConversionFailed { source } => source.code(),
            Error::Tool { .. } => "tool_error",
            Error::Io { .. } => "io_error",
            Error::Config(_) => "config_error",
            Error::Internal(_) => "internal_error",
        }
    }

    /// The message of the underlying failure, without the outer
    /// "Conversion failed" wrapper.
    pub fn details(&self) -> String {
        match self {
            Error::ConversionFailed { source } => source.to_string(),
            other => other.to_string(),
        }
    }

    /// Wrap a pipeline step failure. Validation errors and already wrapped
    /// errors pass through unchanged.
    pub fn conversion(source: Error) -> Self {
        match source {
            e @ (Error::InvalidInput(_) | Error::ConversionFailed { .. }) => e,
            other => Error::ConversionFailed {
                source: Box::new(other),
            },
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Whether this error (or the one it wraps) came from the object store.
    pub fn is_store(&self) -> bool {
        match self {
            Error::Store(_) => true,
            Error::ConversionFailed { source } => source.is_store(),
            _ => false,
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
