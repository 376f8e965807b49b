//! API module for handling HTTP requests and responses

pub(crate) mod handlers;
pub(crate) mod responses;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    services::ServeDir,
    trace::TraceLayer,
};

use crate::state::AppState;

/// Create the application router with all routes.
///
/// Cached product images are served straight off disk under `/images`, the
/// same files ingestion reads, so result links resolve without any extra
/// bookkeeping. Upload size is capped by the configured limit.
pub fn create_router(state: Arc<AppState>) -> Router {
    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Liveness greeting
        .route("/", get(handlers::service_status))
        // Readiness report
        .route("/api/health", get(handlers::health_check))
        // Query endpoint
        .route("/api/search", post(handlers::search_products))
        // Static images out of the cache directory
        .nest_service("/images", ServeDir::new(state.config.images_dir()))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(state.config.max_upload_size))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
