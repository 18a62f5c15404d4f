//! Axum router construction.

use axum::middleware;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::context::AppContext;
use crate::middleware::request_id::request_id_middleware;
use crate::routes;

/// Build the complete Axum router.
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new().route(
        "/cache",
        get(routes::cache::lookup).post(routes::cache::convert),
    );

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api)
        .route("/metrics", get(routes::metrics::metrics_handler))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
