//! Local health and connectivity handlers.

use axum::extract::rejection::JsonRejection;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use tracing::info;

use chatcut_models::{PingRequest, PingResponse};

use crate::error::ApiResult;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
    /// Whether ffmpeg is on PATH, needed for trimming
    pub encoder_available: bool,
}

/// Health check endpoint (liveness probe).
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
        encoder_available: chatcut_media::check_ffmpeg().is_ok(),
    })
}

/// Echo a message back so the plugin can verify it reaches the backend.
pub async fn ping(payload: Result<Json<PingRequest>, JsonRejection>) -> ApiResult<Json<PingResponse>> {
    let Json(req) = payload?;
    info!(message = %req.message, "Ping received");

    Ok(Json(PingResponse {
        status: "ok".to_string(),
        received: req.message,
    }))
}
