use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hlscache")]
#[command(author, version, about = "On-demand MP4 to HLS conversion with object-store caching")]
pub struct Cli {
    /// Path to config file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Start {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config and HLSCACHE_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Convert a single MP4 URL and print its stream URL
    Convert {
        /// Source MP4 URL
        #[arg(required = true)]
        url: String,

        /// Publish to an in-memory store instead of S3 (nothing is kept)
        #[arg(long)]
        dry_store: bool,
    },

    /// Show the artifact key and stream URL an MP4 URL maps to
    Key {
        /// Source MP4 URL
        #[arg(required = true)]
        url: String,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
