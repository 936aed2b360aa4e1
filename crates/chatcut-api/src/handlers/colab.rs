//! Remote worker handlers.

use std::convert::Infallible;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::StreamExt;
use tracing::info;

use chatcut_models::{
    HealthRequest, HealthStatus, ProgressRequest, ProgressResponse, StartJobRequest,
    StartJobResponse,
};

use crate::error::ApiResult;
use crate::services::ColabService;
use crate::state::AppState;

/// Check the remote worker's health.
pub async fn colab_health(
    State(state): State<AppState>,
    payload: Result<Json<HealthRequest>, JsonRejection>,
) -> ApiResult<Json<HealthStatus>> {
    let Json(req) = payload?;
    let status = ColabService::new(&state).health(&req).await?;
    Ok(Json(status))
}

/// Upload a clip and start a remote job.
pub async fn colab_start(
    State(state): State<AppState>,
    payload: Result<Json<StartJobRequest>, JsonRejection>,
) -> ApiResult<Json<StartJobResponse>> {
    let Json(req) = payload?;
    info!(file = %req.file_path, "Start job requested");
    let response = ColabService::new(&state).start(&req).await?;
    Ok(Json(response))
}

/// One progress check; downloads the artifact once the job is complete.
pub async fn colab_progress(
    State(state): State<AppState>,
    payload: Result<Json<ProgressRequest>, JsonRejection>,
) -> ApiResult<Json<ProgressResponse>> {
    let Json(req) = payload?;
    let response = ColabService::new(&state).progress(&req).await?;
    Ok(Json(response))
}

/// Start a job and answer once the artifact is local.
pub async fn colab_process(
    State(state): State<AppState>,
    payload: Result<Json<StartJobRequest>, JsonRejection>,
) -> ApiResult<Json<ProgressResponse>> {
    let Json(req) = payload?;
    info!(file = %req.file_path, "Synchronous processing requested");
    let response = ColabService::new(&state).process(&req).await?;
    Ok(Json(response))
}

/// Start a job and relay its progress as server-sent events.
pub async fn colab_process_stream(
    State(state): State<AppState>,
    payload: Result<Json<StartJobRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(req) = payload?;
    info!(file = %req.file_path, "Streaming processing requested");
    let events = ColabService::new(&state).stream(&req).await?;

    let sse_stream = events
        .map(|event| Ok::<Event, Infallible>(Event::default().data(event.to_value().to_string())));

    Ok(Sse::new(sse_stream)
        .keep_alive(KeepAlive::default())
        .into_response())
}
