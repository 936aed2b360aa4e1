//! Remote job status and trim window definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Canonical job state as reported to the plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Worker is still running (any non-terminal worker status)
    #[default]
    Processing,
    /// Worker finished and produced an artifact
    Complete,
    /// Worker or bridge failed
    Error,
    /// Worker does not know the job id
    NotFound,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Processing => "processing",
            JobStatus::Complete => "complete",
            JobStatus::Error => "error",
            JobStatus::NotFound => "not_found",
        }
    }

    /// Terminal states are absorbing.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Processing)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = JobStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "processing" => Ok(JobStatus::Processing),
            "complete" => Ok(JobStatus::Complete),
            "error" => Ok(JobStatus::Error),
            "not_found" => Ok(JobStatus::NotFound),
            _ => Err(JobStatusParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown job status: {0}")]
pub struct JobStatusParseError(String);

/// Round seconds to the 2-decimal precision used by trim cache keys.
pub fn round_centis(seconds: f64) -> f64 {
    (seconds * 100.0).round() / 100.0
}

/// A `[start, end)` window in seconds, already rounded to 2 decimals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TrimWindow {
    pub start_sec: f64,
    pub end_sec: f64,
}

impl TrimWindow {
    /// Build a window, rounding both bounds first.
    pub fn new(start_sec: f64, end_sec: f64) -> Result<Self, TrimWindowError> {
        if !start_sec.is_finite() || !end_sec.is_finite() {
            return Err(TrimWindowError::NotFinite);
        }

        let start_sec = round_centis(start_sec);
        let end_sec = round_centis(end_sec);

        if start_sec < 0.0 {
            return Err(TrimWindowError::NegativeStart(start_sec));
        }
        if end_sec <= start_sec {
            return Err(TrimWindowError::Empty {
                start: start_sec,
                end: end_sec,
            });
        }

        Ok(Self { start_sec, end_sec })
    }

    pub fn duration(&self) -> f64 {
        self.end_sec - self.start_sec
    }
}

impl fmt::Display for TrimWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}-{:.2}", self.start_sec, self.end_sec)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum TrimWindowError {
    #[error("Trim bounds must be finite numbers")]
    NotFinite,

    #[error("Trim start must not be negative (got {0:.2})")]
    NegativeStart(f64),

    #[error("Trim end ({end:.2}) must be after trim start ({start:.2})")]
    Empty { start: f64, end: f64 },

    #[error("Trim start given without trim end")]
    MissingEnd,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_terminality() {
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Complete.is_terminal());
        assert!(JobStatus::Error.is_terminal());
        assert!(JobStatus::NotFound.is_terminal());
    }

    #[test]
    fn test_status_serde() {
        let json = serde_json::to_string(&JobStatus::NotFound).unwrap();
        assert_eq!(json, "\"not_found\"");
        assert_eq!("COMPLETE".parse::<JobStatus>().unwrap(), JobStatus::Complete);
    }

    #[test]
    fn test_trim_window_rounds() {
        let window = TrimWindow::new(1.234, 5.6789).unwrap();
        assert_eq!(window.start_sec, 1.23);
        assert_eq!(window.end_sec, 5.68);
        assert_eq!(window.to_string(), "1.23-5.68");
    }

    #[test]
    fn test_trim_window_rejects_empty_after_rounding() {
        let err = TrimWindow::new(2.001, 2.004).unwrap_err();
        assert!(matches!(err, TrimWindowError::Empty { .. }));
    }

    #[test]
    fn test_trim_window_rejects_negative_and_nan() {
        assert_eq!(
            TrimWindow::new(-1.0, 2.0).unwrap_err(),
            TrimWindowError::NegativeStart(-1.0)
        );
        assert_eq!(TrimWindow::new(f64::NAN, 2.0).unwrap_err(), TrimWindowError::NotFinite);
    }
}
