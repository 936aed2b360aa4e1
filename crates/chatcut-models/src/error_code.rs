//! Stable machine-readable error codes.
//!
//! Every failure surfaced to the plugin carries one of these codes next to
//! a human-readable message.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error taxonomy shared by every local endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Source file does not exist
    FileNotFound,
    /// Source file exists but cannot be read
    FileAccessError,
    /// Request body is well-formed JSON but semantically invalid
    InvalidRequest,
    /// Local re-encode failed
    TrimError,
    /// DNS, connect or timeout failure talking to the worker
    NetworkError,
    /// Worker answered `/start-job` with a non-200 status
    ColabServerError,
    /// Tunnel served its HTML warning page instead of JSON
    NgrokWarningPage,
    /// Worker answered 200 with a body that is not the expected JSON
    InvalidResponse,
    /// Start succeeded but carried no job id
    NoJobId,
    /// Worker answered `/progress` with a non-200 status
    ProgressCheckFailed,
    /// Worker reported the job failed
    JobFailed,
    /// Worker does not know the job id
    JobNotFound,
    /// Worker reported completion without a download location
    NoDownloadUrl,
    /// Job finished remotely but the artifact could not be retrieved
    DownloadFailed,
    /// Event stream could not be opened or broke mid-way
    StreamError,
    /// Job did not reach a terminal state before the deadline
    Timeout,
}

impl ErrorCode {
    pub const ALL: &'static [ErrorCode] = &[
        ErrorCode::FileNotFound,
        ErrorCode::FileAccessError,
        ErrorCode::InvalidRequest,
        ErrorCode::TrimError,
        ErrorCode::NetworkError,
        ErrorCode::ColabServerError,
        ErrorCode::NgrokWarningPage,
        ErrorCode::InvalidResponse,
        ErrorCode::NoJobId,
        ErrorCode::ProgressCheckFailed,
        ErrorCode::JobFailed,
        ErrorCode::JobNotFound,
        ErrorCode::NoDownloadUrl,
        ErrorCode::DownloadFailed,
        ErrorCode::StreamError,
        ErrorCode::Timeout,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::FileNotFound => "FILE_NOT_FOUND",
            ErrorCode::FileAccessError => "FILE_ACCESS_ERROR",
            ErrorCode::InvalidRequest => "INVALID_REQUEST",
            ErrorCode::TrimError => "TRIM_ERROR",
            ErrorCode::NetworkError => "NETWORK_ERROR",
            ErrorCode::ColabServerError => "COLAB_SERVER_ERROR",
            ErrorCode::NgrokWarningPage => "NGROK_WARNING_PAGE",
            ErrorCode::InvalidResponse => "INVALID_RESPONSE",
            ErrorCode::NoJobId => "NO_JOB_ID",
            ErrorCode::ProgressCheckFailed => "PROGRESS_CHECK_FAILED",
            ErrorCode::JobFailed => "JOB_FAILED",
            ErrorCode::JobNotFound => "JOB_NOT_FOUND",
            ErrorCode::NoDownloadUrl => "NO_DOWNLOAD_URL",
            ErrorCode::DownloadFailed => "DOWNLOAD_FAILED",
            ErrorCode::StreamError => "STREAM_ERROR",
            ErrorCode::Timeout => "TIMEOUT",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ErrorCode {
    type Err = ErrorCodeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_uppercase();
        ErrorCode::ALL
            .iter()
            .copied()
            .find(|code| code.as_str() == upper)
            .ok_or_else(|| ErrorCodeParseError(s.to_string()))
    }
}

#[derive(Debug, Error)]
#[error("Unknown error code: {0}")]
pub struct ErrorCodeParseError(String);
