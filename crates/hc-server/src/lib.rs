//! hc-server: HTTP front end for the hlscache conversion pipeline.
//!
//! - `POST /api/cache` converts (or reuses) an HLS rendition of an MP4 URL
//! - `GET /api/cache` reports whether the rendition already exists
//! - `GET /health` and `GET /metrics`
//!
//! Shuts down gracefully on SIGINT or SIGTERM.

pub mod context;
pub mod error;
pub mod middleware;
pub mod router;
pub mod routes;

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use hc_core::config::Config;

use crate::context::AppContext;

/// Start the hlscache server and run until a shutdown signal arrives.
pub async fn start(config: Config) -> hc_core::Result<()> {
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }

    let tools = hc_av::ToolRegistry::discover(&config.tools);
    for info in tools.check_all() {
        if info.available {
            tracing::info!(
                "Tool found: {} ({})",
                info.name,
                info.version.as_deref().unwrap_or("unknown version")
            );
        } else {
            tracing::warn!("Tool not found: {}", info.name);
        }
    }

    let converter = context::build_converter(&config, &tools).await?;
    tracing::info!(
        "Pipeline ready: store={} bucket={} transcoder={}",
        converter.store_name(),
        config.store.bucket,
        converter.transcoder_name()
    );

    let mut ctx = AppContext::new(config.clone(), converter);
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => ctx = ctx.with_metrics(handle),
        Err(e) => tracing::warn!("Metrics recorder not installed: {e}"),
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| hc_core::Error::Internal(format!("Invalid server address: {e}")))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| hc_core::Error::Internal(format!("Failed to bind to {addr}: {e}")))?;

    tracing::info!("Starting server on {addr}");

    axum::serve(listener, router::build_router(ctx))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("Shutdown signal received");
}
