//! # hc-av
//!
//! External encoder management and scratch storage for the hlscache
//! conversion pipeline.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- find the ffmpeg binary and
//!   report its version.
//! - **Command execution** ([`ToolCommand`]) -- async builder with timeout
//!   and working-directory support for running external processes.
//! - **Scratch workspaces** ([`ScratchSpace`], [`ScratchWorkspace`]) --
//!   per-conversion temporary directories with guaranteed removal.
//! - **Transcoding** ([`Transcoder`], [`FfmpegTranscoder`]) -- MP4 to HLS
//!   segmentation with stream copy.

pub mod command;
pub mod tools;
pub mod transcode;
pub mod workspace;

// ---- Re-exports for convenience ----

pub use command::{ToolCommand, ToolOutput};
pub use tools::{ToolInfo, ToolRegistry};
pub use transcode::{hls_args, FfmpegTranscoder, HlsSettings, Transcoder};
pub use workspace::{ScratchSpace, ScratchWorkspace};
