//! Remote client error types.

use std::path::PathBuf;

use thiserror::Error;

use chatcut_models::{truncate_details, ErrorCode};

pub type RemoteResult<T> = Result<T, RemoteError>;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Cannot read file {}: {source}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Failed to connect to Colab server: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Colab server error: {status}")]
    ServerError { status: u16, body: String },

    #[error("Failed to get progress: {status}")]
    ProgressCheckFailed { status: u16, body: String },

    #[error(
        "ngrok warning page detected - received HTML instead of JSON. \
         Open the Colab URL in a browser once to accept the warning, then retry."
    )]
    InterstitialPage { body: String },

    #[error("Invalid response from Colab server: {body}")]
    InvalidResponse { body: String },

    #[error("No job ID returned from Colab server")]
    NoJobId,

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Event stream failed: {0}")]
    Stream(String),

    #[error("Job did not finish within {0} seconds")]
    Timeout(u64),
}

impl RemoteError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn download_failed(msg: impl Into<String>) -> Self {
        Self::DownloadFailed(msg.into())
    }

    /// Map onto the client-facing error taxonomy.
    pub fn code(&self) -> ErrorCode {
        match self {
            RemoteError::FileNotFound(_) => ErrorCode::FileNotFound,
            RemoteError::FileAccess { .. } => ErrorCode::FileAccessError,
            RemoteError::InvalidRequest(_) => ErrorCode::InvalidRequest,
            RemoteError::Network(_) => ErrorCode::NetworkError,
            RemoteError::ServerError { .. } => ErrorCode::ColabServerError,
            RemoteError::ProgressCheckFailed { .. } => ErrorCode::ProgressCheckFailed,
            RemoteError::InterstitialPage { .. } => ErrorCode::NgrokWarningPage,
            RemoteError::InvalidResponse { .. } => ErrorCode::InvalidResponse,
            RemoteError::NoJobId => ErrorCode::NoJobId,
            RemoteError::DownloadFailed(_) => ErrorCode::DownloadFailed,
            RemoteError::Stream(_) => ErrorCode::StreamError,
            RemoteError::Timeout(_) => ErrorCode::Timeout,
        }
    }

    /// Bounded remote body text, when there is one worth showing.
    pub fn details(&self) -> Option<String> {
        match self {
            RemoteError::ServerError { body, .. }
            | RemoteError::ProgressCheckFailed { body, .. }
            | RemoteError::InterstitialPage { body }
                if !body.is_empty() =>
            {
                Some(truncate_details(body))
            }
            _ => None,
        }
    }

    /// Build the right "body was not JSON" error for a raw response.
    pub fn unparseable(body: &str) -> Self {
        if crate::interstitial::is_interstitial_page(body) {
            RemoteError::InterstitialPage {
                body: truncate_details(body),
            }
        } else {
            let snippet: String = body.chars().take(200).collect();
            RemoteError::InvalidResponse { body: snippet }
        }
    }
}
