//! API error types.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use chatcut_models::ErrorCode;

pub type ApiResult<T> = Result<T, ApiError>;

/// Malformed requests. Job outcomes, failures included, travel in 200
/// bodies instead.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Invalid JSON body: {0}")]
    Json(#[from] JsonRejection),
}

impl ApiError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn code(&self) -> ErrorCode {
        ErrorCode::InvalidRequest
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Json(rejection) => rejection.status(),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorCode,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = ErrorResponse {
            error: self.code(),
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
