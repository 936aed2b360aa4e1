//! Progress interpretation.
//!
//! Maps raw worker payloads onto the job state machine:
//!
//! ```text
//! processing -> processing   (progress tolerated if it goes backwards)
//! processing -> complete     (needs a download URL, else error/NO_DOWNLOAD_URL)
//! processing -> error
//! processing -> not_found
//! terminal   -> same terminal
//! ```

use tracing::debug;

use chatcut_models::{ErrorCode, JobStatus, ProgressSnapshot};

use crate::types::ProgressPayload;

/// Outcome of interpreting one payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Interpretation {
    pub snapshot: ProgressSnapshot,
    /// The job just reached `complete` and its artifact should be fetched.
    pub download_required: bool,
}

impl Interpretation {
    fn settled(snapshot: ProgressSnapshot) -> Self {
        Self {
            snapshot,
            download_required: false,
        }
    }
}

/// Interpret a raw payload given the previous snapshot of the same job.
pub fn interpret(raw: &ProgressPayload, prior: Option<&ProgressSnapshot>) -> Interpretation {
    if let Some(prior) = prior.filter(|p| p.is_terminal()) {
        return Interpretation::settled(prior.clone());
    }

    let status = raw.effective_status();
    let stage = raw
        .stage_label()
        .map(str::to_string)
        .unwrap_or_else(|| status.clone());
    let progress = raw.progress_value();

    match status.as_str() {
        "complete" => match raw.output_ref() {
            Some(output_ref) => {
                let message = raw
                    .message_text()
                    .unwrap_or_else(|| "Processing complete!".to_string());
                Interpretation {
                    snapshot: ProgressSnapshot::complete(output_ref, message),
                    download_required: true,
                }
            }
            None => Interpretation::settled(ProgressSnapshot::failed(
                ErrorCode::NoDownloadUrl,
                "complete",
                100.0,
                "Job complete but no download URL provided",
            )),
        },
        "error" | "failed" => {
            let reason = raw
                .error_text()
                .or_else(|| raw.message_text())
                .unwrap_or_else(|| "Unknown error".to_string());
            Interpretation::settled(ProgressSnapshot::failed(
                ErrorCode::JobFailed,
                stage,
                progress,
                format!("Job failed: {}", reason),
            ))
        }
        "not_found" => {
            let reason = raw
                .error_text()
                .unwrap_or_else(|| "Job not found".to_string());
            Interpretation::settled(ProgressSnapshot::not_found(format!(
                "Job not found: {}",
                reason
            )))
        }
        _ => {
            let mut progress = progress;
            if let Some(prior) = prior {
                if progress < prior.progress {
                    debug!(
                        prior = prior.progress,
                        reported = progress,
                        "Progress went backwards, keeping prior value"
                    );
                    progress = prior.progress;
                }
            }
            let message = raw
                .message_text()
                .unwrap_or_else(|| "Processing...".to_string());
            Interpretation::settled(ProgressSnapshot::processing(stage, progress, message))
        }
    }
}

/// Interpreter with memory, for callers that follow one job over time.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    current: Option<ProgressSnapshot>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next payload.
    pub fn observe(&mut self, raw: &ProgressPayload) -> Interpretation {
        let interpretation = interpret(raw, self.current.as_ref());
        self.current = Some(interpretation.snapshot.clone());
        interpretation
    }

    pub fn current(&self) -> Option<&ProgressSnapshot> {
        self.current.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> ProgressPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_processing_passthrough() {
        let out = interpret(
            &payload(json!({"status": "processing", "stage": "tracking", "progress": 40, "message": "Tracking objects"})),
            None,
        );
        assert_eq!(out.snapshot.status, JobStatus::Processing);
        assert_eq!(out.snapshot.stage, "tracking");
        assert_eq!(out.snapshot.progress, 40.0);
        assert!(!out.download_required);
    }

    #[test]
    fn test_unknown_status_is_processing() {
        let out = interpret(&payload(json!({"status": "pending"})), None);
        assert_eq!(out.snapshot.status, JobStatus::Processing);
        assert_eq!(out.snapshot.stage, "pending");
    }

    #[test]
    fn test_complete_requires_download() {
        let out = interpret(
            &payload(json!({"status": "complete", "download_url": "/download/out.mp4", "filename": "out.mp4"})),
            None,
        );
        assert_eq!(out.snapshot.status, JobStatus::Complete);
        assert_eq!(out.snapshot.progress, 100.0);
        assert!(out.snapshot.output_ref.is_some());
        assert!(out.download_required);
    }

    #[test]
    fn test_complete_without_url_degrades() {
        let out = interpret(&payload(json!({"status": "complete"})), None);
        assert_eq!(out.snapshot.status, JobStatus::Error);
        assert_eq!(out.snapshot.error_code, Some(ErrorCode::NoDownloadUrl));
        assert!(out.snapshot.output_ref.is_none());
        assert!(!out.download_required);
    }

    #[test]
    fn test_error_and_not_found() {
        let out = interpret(
            &payload(json!({"status": "error", "stage": "render", "error": "CUDA OOM"})),
            None,
        );
        assert_eq!(out.snapshot.error_code, Some(ErrorCode::JobFailed));
        assert_eq!(out.snapshot.message, "Job failed: CUDA OOM");
        assert_eq!(out.snapshot.stage, "render");

        let out = interpret(&payload(json!({"status": "not_found"})), None);
        assert_eq!(out.snapshot.status, JobStatus::NotFound);
        assert_eq!(out.snapshot.error_code, Some(ErrorCode::JobNotFound));
    }

    #[test]
    fn test_terminal_states_absorb() {
        let mut tracker = ProgressTracker::new();
        let first = tracker.observe(&payload(
            json!({"status": "complete", "download_url": "/d/x.mp4", "filename": "x.mp4"}),
        ));
        assert!(first.download_required);

        let second = tracker.observe(&payload(json!({"status": "processing", "progress": 10})));
        assert_eq!(second.snapshot.status, JobStatus::Complete);
        assert!(!second.download_required);
    }

    #[test]
    fn test_backwards_progress_is_tolerated() {
        let mut tracker = ProgressTracker::new();
        tracker.observe(&payload(json!({"status": "processing", "progress": 60})));
        let out = tracker.observe(&payload(json!({"status": "processing", "progress": 20})));
        assert_eq!(out.snapshot.status, JobStatus::Processing);
        assert_eq!(out.snapshot.progress, 60.0);
    }
}
