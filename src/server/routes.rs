//! Router configuration for the web server.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    let downloads = ServeDir::new(state.jobs.downloads_dir());

    Router::new()
        // Discovery
        .route("/fetch-video-urls", post(handlers::discover_videos))
        .route("/api/discover", post(handlers::discover_videos))
        // Media info and downloads
        .route("/api/info", post(handlers::media_info))
        .route("/api/download", post(handlers::start_download))
        .route("/api/status/:id", get(handlers::download_status))
        .nest_service("/downloads", downloads)
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
