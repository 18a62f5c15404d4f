mod cli;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};

use hc_core::config::Config;
use hc_pipeline::SourceRules;
use hc_store::MemoryArtifactStore;

fn load_config(path: Option<&Path>) -> Config {
    Config::resolve(path, |key| std::env::var(key).ok())
}

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = load_config(config_path);

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting hlscache server");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    hc_server::start(config).await?;
    Ok(())
}

async fn convert_url(url: &str, config_path: Option<&Path>, dry_store: bool) -> Result<()> {
    let config = load_config(config_path);

    let tools = hc_av::ToolRegistry::discover(&config.tools);

    let converter = if dry_store {
        tracing::info!("Using in-memory artifact store; nothing will be published");
        let store = Arc::new(MemoryArtifactStore::new());
        hc_server::context::build_converter_with_store(&config, &tools, store)?
    } else {
        hc_server::context::build_converter(&config, &tools).await?
    };

    let outcome = converter.convert(url).await?;
    if outcome.cached {
        println!("Already cached: {}", outcome.artifact_key);
    } else {
        println!("Converted: {}", outcome.artifact_key);
    }
    println!("{}", outcome.stream_url);
    Ok(())
}

fn show_key(url: &str, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path);
    let rules = SourceRules::new(&config.conversion, &config.store)?;
    let source = rules.parse(url)?;

    println!("Base name:    {}", source.base_name);
    println!("Artifact key: {}", source.artifact_key);
    println!("Bucket:       {}", config.store.bucket);
    println!("Stream URL:   {}", source.stream_url);
    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = load_config(config_path);
    let tools = hc_av::ToolRegistry::discover(&config.tools);
    let mut all_ok = true;

    for tool in tools.check_all() {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({version})");
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Conversions will fail until they are installed.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {}", p.display());
            let config = Config::load(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Bucket: {} ({})", config.store.bucket, config.store.region);
    if let Some(ref endpoint) = config.store.endpoint {
        println!("  Endpoint: {endpoint}");
    }
    println!("  CDN domain: {}", config.store.cdn_domain);
    println!(
        "  Segments: {}s, dedupe in flight: {}",
        config.conversion.segment_duration_secs, config.conversion.dedupe_in_flight
    );

    let warnings = config.validate();
    if !warnings.is_empty() {
        println!("\nWarnings:");
        for warning in warnings {
            println!("  ! {warning}");
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise the verbose flag picks the default filter.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "hlscache=trace,hc_server=debug,hc_pipeline=debug,hc_av=debug,hc_store=debug,tower_http=debug".to_string()
        } else {
            "hlscache=info,hc_server=info,hc_pipeline=info,hc_av=info,hc_store=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Convert { url, dry_store } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(convert_url(&url, cli.config.as_deref(), dry_store))
        }
        Commands::Key { url } => show_key(&url, cli.config.as_deref()),
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("hlscache {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
