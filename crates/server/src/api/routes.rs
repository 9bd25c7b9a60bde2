use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{handlers, middleware::metrics_middleware, options, resolve, stream};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config));

    Router::new()
        .nest("/api/v1", api_routes)
        // Client-facing routes
        .route("/stream/{type}/{id}", get(stream::get_streams))
        .route("/{config}/stream/{type}/{id}", get(stream::get_configured_streams))
        .route("/options", get(options::get_options))
        .route("/resolve/{info_hash}/{file_index}", get(resolve::resolve_stream))
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
