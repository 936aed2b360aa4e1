//! API routes.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{
    colab_health, colab_process, colab_process_stream, colab_progress, colab_start, health, ping,
};
use crate::middleware::{cors_layer, request_id, request_logging};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let colab_routes = Router::new()
        .route("/health", post(colab_health))
        .route("/start", post(colab_start))
        .route("/progress", post(colab_progress))
        .route("/process", post(colab_process))
        .route("/process-stream", post(colab_process_stream));

    let api_routes = Router::new()
        .route("/ping", post(ping))
        .nest("/colab", colab_routes);

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
