//! Remote job orchestration.
//!
//! Every job-starting path runs the same preparation: validate input, trim
//! locally if a window was requested, normalize the worker URL. Trimming
//! must finish before anything is uploaded.

use futures_util::stream::{self, BoxStream, StreamExt};
use tracing::{error, info};

use chatcut_media::MediaError;
use chatcut_models::{
    ErrorCode, HealthRequest, HealthStatus, ProgressRequest, ProgressResponse, StartJobRequest,
    StartJobResponse, StreamEvent,
};
use chatcut_remote::{JobSubmission, RemoteEndpoint, RemoteError};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Why a job never reached the remote worker.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
}

impl Rejection {
    fn from_remote(err: &RemoteError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
            details: err.details(),
        }
    }

    fn from_media(err: &MediaError) -> Self {
        Self {
            code: err.error_code(),
            message: format!("Failed to trim video: {}", err),
            details: err.diagnostic(),
        }
    }

    /// Malformed requests are HTTP errors; everything else is reported in
    /// the operation's own body.
    fn respond<T>(self, into_body: impl FnOnce(Rejection) -> T) -> ApiResult<T> {
        if self.code == ErrorCode::InvalidRequest {
            Err(ApiError::InvalidRequest(self.message))
        } else {
            Ok(into_body(self))
        }
    }
}

pub struct ColabService<'a> {
    state: &'a AppState,
}

impl<'a> ColabService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    pub async fn health(&self, req: &HealthRequest) -> ApiResult<HealthStatus> {
        let endpoint = normalize(&req.colab_url)?;
        Ok(self.state.client.health(&endpoint).await)
    }

    pub async fn start(&self, req: &StartJobRequest) -> ApiResult<StartJobResponse> {
        let (endpoint, submission) = match self.prepare(req).await {
            Ok(prepared) => prepared,
            Err(rejection) => {
                return rejection.respond(|r| {
                    StartJobResponse::failed(r.code, r.message).with_details(r.details)
                })
            }
        };

        match self.state.client.start(&endpoint, &submission).await {
            Ok(started) => Ok(StartJobResponse::started(started.job_id, started.message)),
            Err(e) => {
                error!(code = %e.code(), error = %e, "Failed to start Colab job");
                Ok(StartJobResponse::failed(e.code(), e.to_string()).with_details(e.details()))
            }
        }
    }

    pub async fn progress(&self, req: &ProgressRequest) -> ApiResult<ProgressResponse> {
        let job_id = req.job_id.trim();
        if job_id.is_empty() {
            return Err(ApiError::invalid_request("job_id is required"));
        }
        let endpoint = normalize(&req.colab_url)?;

        Ok(self
            .state
            .driver
            .check_progress(&endpoint, job_id, req.original_filename.as_deref())
            .await)
    }

    /// Start a job and wait for its artifact.
    pub async fn process(&self, req: &StartJobRequest) -> ApiResult<ProgressResponse> {
        match self.prepare(req).await {
            Ok((endpoint, submission)) => Ok(self.state.driver.process(&endpoint, &submission).await),
            Err(rejection) => rejection.respond(|r| {
                ProgressResponse::failed(r.code, r.message).with_details(r.details)
            }),
        }
    }

    /// Start a job over the worker's event stream.
    pub async fn stream(&self, req: &StartJobRequest) -> ApiResult<BoxStream<'static, StreamEvent>> {
        match self.prepare(req).await {
            Ok((endpoint, submission)) => Ok(self.state.bridge.open(endpoint, submission).boxed()),
            Err(rejection) => rejection.respond(|r| {
                let event = match r.details {
                    Some(details) => StreamEvent::error_with_details(r.code, r.message, details),
                    None => StreamEvent::error(r.code, r.message),
                };
                stream::once(async move { event }).boxed()
            }),
        }
    }

    async fn prepare(
        &self,
        req: &StartJobRequest,
    ) -> Result<(RemoteEndpoint, JobSubmission), Rejection> {
        let submission =
            JobSubmission::prepare(&req.file_path, &req.prompt, req.trim_start, req.trim_end)
                .await
                .map_err(|e| Rejection::from_remote(&e))?;

        let endpoint =
            RemoteEndpoint::normalize(&req.colab_url).map_err(|e| Rejection::from_remote(&e))?;

        let Some(window) = submission.trim_window() else {
            return Ok((endpoint, submission));
        };

        info!(
            source = %submission.source_path().display(),
            window = %window,
            "Trimming before upload"
        );
        let trimmed = self
            .state
            .trim_cache
            .ensure_trimmed(submission.source_path(), window)
            .await
            .map_err(|e| {
                error!(error = %e, "Trim failed, not uploading");
                Rejection::from_media(&e)
            })?;

        Ok((endpoint, submission.with_upload_path(trimmed)))
    }
}

fn normalize(raw: &str) -> ApiResult<RemoteEndpoint> {
    RemoteEndpoint::normalize(raw).map_err(|e| ApiError::invalid_request(e.to_string()))
}
