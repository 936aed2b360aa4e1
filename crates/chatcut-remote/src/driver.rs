//! Drives remote jobs for callers that want a plain answer.

use std::time::Instant;

use tracing::{debug, info, warn};

use chatcut_models::{ErrorCode, ProgressResponse};

use crate::client::JobClient;
use crate::endpoint::RemoteEndpoint;
use crate::error::RemoteError;
use crate::fetch::ArtifactFetcher;
use crate::job::JobSubmission;
use crate::progress::{interpret, Interpretation, ProgressTracker};

/// Polls jobs and fetches their artifacts.
#[derive(Debug, Clone)]
pub struct JobDriver {
    client: JobClient,
    fetcher: ArtifactFetcher,
}

impl JobDriver {
    pub fn new(client: JobClient, fetcher: ArtifactFetcher) -> Self {
        Self { client, fetcher }
    }

    /// One progress check; downloads the artifact if the job is complete.
    pub async fn check_progress(
        &self,
        endpoint: &RemoteEndpoint,
        job_id: &str,
        name_hint: Option<&str>,
    ) -> ProgressResponse {
        match self.client.poll_raw(endpoint, job_id).await {
            Ok(raw) => {
                let interpretation = interpret(&raw, None);
                self.settle(endpoint, job_id, name_hint, interpretation).await
            }
            Err(e) => failed_response(&e),
        }
    }

    /// Poll until the job reaches a terminal state, then fetch once.
    ///
    /// Up to `max_poll_failures` consecutive failed polls are re-issued;
    /// `not_found` ends the loop at once.
    pub async fn run_to_completion(
        &self,
        endpoint: &RemoteEndpoint,
        job_id: &str,
        name_hint: Option<&str>,
    ) -> ProgressResponse {
        let config = self.client.config();
        let started = Instant::now();
        let max_failures = config.max_poll_failures.max(1);
        let mut tracker = ProgressTracker::new();
        let mut failures = 0u32;

        loop {
            match self.client.poll_raw(endpoint, job_id).await {
                Ok(raw) => {
                    failures = 0;
                    let interpretation = tracker.observe(&raw);
                    if interpretation.snapshot.is_terminal() {
                        return self.settle(endpoint, job_id, name_hint, interpretation).await;
                    }
                    debug!(
                        job_id = %job_id,
                        stage = %interpretation.snapshot.stage,
                        progress = interpretation.snapshot.progress,
                        "Job still processing"
                    );
                }
                Err(e) => {
                    failures += 1;
                    warn!(
                        job_id = %job_id,
                        attempt = failures,
                        max = max_failures,
                        error = %e,
                        "Progress check failed"
                    );
                    if failures >= max_failures {
                        return failed_response(&e);
                    }
                }
            }

            if started.elapsed() + config.poll_interval > config.stream_timeout {
                let err = RemoteError::Timeout(config.stream_timeout.as_secs());
                warn!(job_id = %job_id, "Job did not finish in time");
                let mut response = failed_response(&err);
                if let Some(current) = tracker.current() {
                    response.stage = current.stage.clone();
                    response.progress = current.progress;
                }
                return response;
            }

            tokio::time::sleep(config.poll_interval).await;
        }
    }

    /// Start a job and drive it to completion.
    pub async fn process(
        &self,
        endpoint: &RemoteEndpoint,
        submission: &JobSubmission,
    ) -> ProgressResponse {
        let started = match self.client.start(endpoint, submission).await {
            Ok(started) => started,
            Err(e) => return failed_response(&e),
        };

        info!(job_id = %started.job_id, "Driving job to completion");
        let hint = submission
            .source_path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());
        self.run_to_completion(endpoint, &started.job_id, hint.as_deref())
            .await
    }

    async fn settle(
        &self,
        endpoint: &RemoteEndpoint,
        job_id: &str,
        name_hint: Option<&str>,
        interpretation: Interpretation,
    ) -> ProgressResponse {
        let response = ProgressResponse::from_snapshot(&interpretation.snapshot);

        let output = match (&interpretation.snapshot.output_ref, interpretation.download_required) {
            (Some(output), true) => output,
            _ => return response,
        };

        match self
            .fetcher
            .fetch(endpoint, output, Some(job_id), name_hint)
            .await
        {
            Ok(artifact) => response.with_output_path(artifact.path_string()),
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "Job complete but artifact download failed");
                ProgressResponse {
                    error: Some(ErrorCode::DownloadFailed),
                    message: format!("Job complete but video download failed: {}", e),
                    ..response
                }
            }
        }
    }
}

fn failed_response(err: &RemoteError) -> ProgressResponse {
    ProgressResponse::failed(err.code(), err.to_string()).with_details(err.details())
}
