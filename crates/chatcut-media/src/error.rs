//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

use chatcut_models::{truncate_details, ErrorCode};

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during local media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid video file: {0}")]
    InvalidVideo(String),
}

impl MediaError {
    /// Create an FFmpeg failure error; stderr is truncated on the way in.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr: stderr.map(|s| truncate_details(s.trim())),
            exit_code,
        }
    }

    /// Bounded tool output suitable for echoing to a client.
    pub fn diagnostic(&self) -> Option<String> {
        match self {
            MediaError::FfmpegFailed { stderr, .. } | MediaError::FfprobeFailed { stderr, .. } => {
                stderr.as_deref().map(truncate_details)
            }
            _ => None,
        }
    }

    /// Map onto the client-facing error taxonomy.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            MediaError::FileNotFound(_) => ErrorCode::FileNotFound,
            _ => ErrorCode::TrimError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stderr_is_bounded() {
        let err = MediaError::ffmpeg_failed("exit 1", Some("e".repeat(10_000)), Some(1));
        let diag = err.diagnostic().unwrap();
        assert!(diag.len() < 600);
        assert_eq!(err.error_code(), ErrorCode::TrimError);
    }

    #[test]
    fn test_missing_file_code() {
        let err = MediaError::FileNotFound(PathBuf::from("/nope.mp4"));
        assert_eq!(err.error_code(), ErrorCode::FileNotFound);
        assert!(err.diagnostic().is_none());
    }
}
