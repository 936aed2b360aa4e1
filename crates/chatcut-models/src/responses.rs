//! Response bodies returned to the plugin.
//!
//! Field names and null-vs-absent behaviour match what the plugin already
//! parses: `job_id`, `error` and `output_path` are always present (possibly
//! `null`), `details` and `gpu` only when known.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error_code::ErrorCode;
use crate::job::JobStatus;
use crate::progress::ProgressSnapshot;

/// Upper bound for any diagnostic text echoed back to the client.
pub const MAX_DETAILS_CHARS: usize = 500;

/// Truncate diagnostic text to [`MAX_DETAILS_CHARS`] characters.
pub fn truncate_details(text: &str) -> String {
    match text.char_indices().nth(MAX_DETAILS_CHARS) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Response of the start operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StartJobResponse {
    pub job_id: Option<String>,
    /// `started` or `error`
    pub status: String,
    pub message: String,
    pub error: Option<ErrorCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl StartJobResponse {
    pub fn started(job_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            job_id: Some(job_id.into()),
            status: "started".to_string(),
            message: message.into(),
            error: None,
            details: None,
        }
    }

    pub fn failed(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            job_id: None,
            status: "error".to_string(),
            message: message.into(),
            error: Some(code),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Option<String>) -> Self {
        self.details = details.map(|d| truncate_details(&d));
        self
    }
}

/// Response of the progress operation (also the final body of synchronous
/// processing).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProgressResponse {
    pub status: JobStatus,
    pub stage: String,
    pub progress: f64,
    pub message: String,
    /// Set only once the artifact exists locally
    pub output_path: Option<String>,
    pub error: Option<ErrorCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ProgressResponse {
    /// Build from an interpreted snapshot; `output_path` is attached by the
    /// caller after a successful fetch.
    pub fn from_snapshot(snapshot: &ProgressSnapshot) -> Self {
        Self {
            status: snapshot.status,
            stage: snapshot.stage.clone(),
            progress: snapshot.progress,
            message: snapshot.message.clone(),
            output_path: None,
            error: snapshot.error_code,
            details: None,
        }
    }

    /// A bridge-side failure that happened before any snapshot existed.
    pub fn failed(code: ErrorCode, message: impl Into<String>) -> Self {
        let status = if code == ErrorCode::JobNotFound {
            JobStatus::NotFound
        } else {
            JobStatus::Error
        };

        Self {
            status,
            stage: "unknown".to_string(),
            progress: 0.0,
            message: message.into(),
            output_path: None,
            error: Some(code),
            details: None,
        }
    }

    pub fn with_output_path(mut self, path: impl Into<String>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: Option<String>) -> Self {
        self.details = details.map(|d| truncate_details(&d));
        self
    }
}

/// Response of the remote health check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HealthStatus {
    pub healthy: bool,
    /// `ok` or `error`
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu: Option<String>,
    pub error: Option<String>,
}

impl HealthStatus {
    pub fn healthy(gpu: Option<String>) -> Self {
        Self {
            healthy: true,
            status: "ok".to_string(),
            gpu,
            error: None,
        }
    }

    pub fn unhealthy(reason: impl Into<String>) -> Self {
        Self {
            healthy: false,
            status: "error".to_string(),
            gpu: None,
            error: Some(reason.into()),
        }
    }
}
