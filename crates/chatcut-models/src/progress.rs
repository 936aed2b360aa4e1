//! Progress snapshots produced by interpreting worker payloads.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error_code::ErrorCode;
use crate::job::JobStatus;

/// Where a completed artifact can be fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct OutputRef {
    /// Absolute URL, or a path relative to the worker base URL
    pub download_url: String,
    /// Filename the worker gave the artifact
    pub filename: String,
}

/// Result of one poll (or one stream event) after interpretation.
///
/// `status == Complete` always comes with `output_ref`; the interpreter
/// degrades anything else to `Error` / `NO_DOWNLOAD_URL`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProgressSnapshot {
    pub status: JobStatus,
    /// Worker-defined label, passed through untouched
    pub stage: String,
    /// Percentage in `[0, 100]`
    pub progress: f64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_ref: Option<OutputRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
}

impl ProgressSnapshot {
    /// A still-running snapshot.
    pub fn processing(stage: impl Into<String>, progress: f64, message: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Processing,
            stage: stage.into(),
            progress: clamp_progress(progress),
            message: message.into(),
            output_ref: None,
            error_code: None,
        }
    }

    /// A completed snapshot; the only constructor that yields `Complete`.
    pub fn complete(output_ref: OutputRef, message: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Complete,
            stage: "complete".to_string(),
            progress: 100.0,
            message: message.into(),
            output_ref: Some(output_ref),
            error_code: None,
        }
    }

    /// A failed snapshot.
    pub fn failed(
        code: ErrorCode,
        stage: impl Into<String>,
        progress: f64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status: JobStatus::Error,
            stage: stage.into(),
            progress: clamp_progress(progress),
            message: message.into(),
            output_ref: None,
            error_code: Some(code),
        }
    }

    /// The worker does not know this job.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: JobStatus::NotFound,
            stage: "unknown".to_string(),
            progress: 0.0,
            message: message.into(),
            output_ref: None,
            error_code: Some(ErrorCode::JobNotFound),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Clamp a reported percentage into `[0, 100]`; NaN becomes 0.
pub fn clamp_progress(progress: f64) -> f64 {
    if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_carries_output_ref() {
        let snap = ProgressSnapshot::complete(
            OutputRef {
                download_url: "/download/a.mp4".to_string(),
                filename: "a.mp4".to_string(),
            },
            "done",
        );
        assert_eq!(snap.status, JobStatus::Complete);
        assert!(snap.output_ref.is_some());
        assert_eq!(snap.progress, 100.0);
    }

    #[test]
    fn test_progress_is_clamped() {
        assert_eq!(ProgressSnapshot::processing("tracking", 140.0, "").progress, 100.0);
        assert_eq!(ProgressSnapshot::processing("tracking", -3.0, "").progress, 0.0);
        assert_eq!(clamp_progress(f64::NAN), 0.0);
    }

    #[test]
    fn test_not_found_is_terminal() {
        let snap = ProgressSnapshot::not_found("Job abc not found");
        assert!(snap.is_terminal());
        assert_eq!(snap.error_code, Some(ErrorCode::JobNotFound));
    }
}
