//! Remote worker HTTP client.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use chatcut_models::{HealthStatus, ProgressSnapshot};

use crate::config::RemoteConfig;
use crate::endpoint::RemoteEndpoint;
use crate::error::{RemoteError, RemoteResult};
use crate::job::{video_mime_type, JobSubmission};
use crate::progress::interpret;
use crate::types::{HealthPayload, ProgressPayload, StartJobPayload, StartedJob};

/// Client for the remote processing worker.
///
/// Holds configuration only; the HTTP client is built per endpoint because
/// TLS verification and default headers depend on the host.
#[derive(Debug, Clone)]
pub struct JobClient {
    config: RemoteConfig,
}

impl JobClient {
    pub fn new(config: RemoteConfig) -> Self {
        Self { config }
    }

    /// Create from environment variables.
    pub fn from_env() -> Self {
        Self::new(RemoteConfig::from_env())
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    pub(crate) fn http(&self, endpoint: &RemoteEndpoint) -> RemoteResult<Client> {
        endpoint.http_client(&self.config.user_agent, self.config.connect_timeout)
    }

    /// Check whether the worker is reachable. Never fails.
    pub async fn health(&self, endpoint: &RemoteEndpoint) -> HealthStatus {
        let http = match self.http(endpoint) {
            Ok(http) => http,
            Err(e) => return HealthStatus::unhealthy(e.to_string()),
        };

        let url = endpoint.url("/health");
        let response = match http
            .get(&url)
            .timeout(self.config.health_timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %url, error = %e, "Colab health check network error");
                return HealthStatus::unhealthy(format!("Failed to connect: {}", e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = status.as_u16(), "Colab health check failed");
            return HealthStatus::unhealthy(format!("Health check returned {}", status.as_u16()));
        }

        match read_json::<HealthPayload>(response).await {
            Ok(payload) => {
                let gpu = payload.gpu_label().unwrap_or_else(|| "unknown".to_string());
                info!(gpu = %gpu, "Colab health check passed");
                HealthStatus::healthy(Some(gpu))
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Colab health check returned an unusable body");
                HealthStatus::unhealthy(e.to_string())
            }
        }
    }

    /// Upload the submission and start a remote job.
    pub async fn start(
        &self,
        endpoint: &RemoteEndpoint,
        submission: &JobSubmission,
    ) -> RemoteResult<StartedJob> {
        let http = self.http(endpoint)?;
        let url = endpoint.url("/start-job");
        let form = upload_form(submission).await?;

        info!(
            url = %url,
            file = %submission.upload_file_name(),
            trimmed = submission.trim_window().is_some(),
            "Starting Colab job"
        );

        let response = http
            .post(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .multipart(form)
            .timeout(self.config.start_timeout)
            .send()
            .await
            .map_err(|e| {
                error!(url = %url, error = %e, "Network error starting job");
                RemoteError::Network(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), "Start job failed");
            return Err(RemoteError::ServerError {
                status: status.as_u16(),
                body,
            });
        }

        let payload: StartJobPayload = read_json(response).await?;
        let job_id = payload.job_id().ok_or_else(|| {
            error!(?payload, "No job_id in start response");
            RemoteError::NoJobId
        })?;

        info!(job_id = %job_id, "Colab job started");

        let message = payload
            .message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("Processing started for {}", submission.upload_file_name()));

        Ok(StartedJob {
            job_id,
            status: "started".to_string(),
            message,
        })
    }

    /// Fetch the raw progress payload of a job.
    pub async fn poll_raw(
        &self,
        endpoint: &RemoteEndpoint,
        job_id: &str,
    ) -> RemoteResult<ProgressPayload> {
        let job_id = job_id.trim();
        if job_id.is_empty() {
            return Err(RemoteError::invalid_request("job_id is required"));
        }

        let http = self.http(endpoint)?;
        let url = endpoint.url(&format!("/progress/{}", job_id));
        debug!(url = %url, "Checking job progress");

        let response = http
            .get(&url)
            .timeout(self.config.poll_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(job_id = %job_id, status = status.as_u16(), "Progress check failed");
            return Err(RemoteError::ProgressCheckFailed {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = read_json(response).await?;
        ProgressPayload::from_event(&body).ok_or_else(|| {
            error!(job_id = %job_id, "Progress response is not a JSON object");
            RemoteError::unparseable(&body.to_string())
        })
    }

    /// Poll a job and interpret the answer.
    ///
    /// Stateless: a `complete` snapshot always carries the download
    /// reference, fetching it is up to the caller.
    pub async fn poll(&self, endpoint: &RemoteEndpoint, job_id: &str) -> RemoteResult<ProgressSnapshot> {
        let raw = self.poll_raw(endpoint, job_id).await?;
        Ok(interpret(&raw, None).snapshot)
    }

    pub(crate) fn stream_timeout(&self) -> Duration {
        self.config.stream_timeout
    }
}

/// Multipart body with `file` streamed from disk and `prompt`.
pub(crate) async fn upload_form(submission: &JobSubmission) -> RemoteResult<Form> {
    let path = submission.upload_path();
    let file = tokio::fs::File::open(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            RemoteError::FileNotFound(path.to_path_buf())
        } else {
            RemoteError::FileAccess {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;
    let len = file
        .metadata()
        .await
        .map_err(|e| RemoteError::FileAccess {
            path: path.to_path_buf(),
            source: e,
        })?
        .len();

    let part = Part::stream_with_length(Body::from(file), len)
        .file_name(submission.upload_file_name())
        .mime_str(video_mime_type(path))?;

    Ok(Form::new()
        .part("file", part)
        .text("prompt", submission.prompt().to_string()))
}

/// Read a body as JSON, classifying non-JSON bodies.
async fn read_json<T: DeserializeOwned>(response: Response) -> RemoteResult<T> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| {
        let snippet: String = body.chars().take(500).collect();
        error!(error = %e, body = %snippet, "Invalid JSON response");
        RemoteError::unparseable(&body)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_keeps_config() {
        let client = JobClient::new(RemoteConfig::default());
        assert_eq!(client.config().poll_timeout, Duration::from_secs(30));
        assert_eq!(client.stream_timeout(), Duration::from_secs(600));
    }

    #[tokio::test]
    async fn test_upload_form_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.mp4");
        std::fs::write(&source, b"x").unwrap();
        let submission = JobSubmission::prepare(source.to_str().unwrap(), "p", None, None)
            .await
            .unwrap()
            .with_upload_path(dir.path().join("gone.mp4"));

        let err = upload_form(&submission).await.unwrap_err();
        assert_eq!(err.code(), chatcut_models::ErrorCode::FileNotFound);
    }
}
