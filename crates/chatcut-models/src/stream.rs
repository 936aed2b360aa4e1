//! Outbound event stream messages.
//!
//! Every event is a JSON object with a `stage` field. Upstream worker events
//! are relayed verbatim; the bridge only synthesizes `downloading`, the final
//! `complete`, and its own `error` events.

use serde::{Serialize, Serializer};
use serde_json::{json, Value};

use crate::error_code::ErrorCode;

/// Stage label of the terminal success event.
pub const STAGE_COMPLETE: &str = "complete";
/// Stage label of the terminal failure event.
pub const STAGE_ERROR: &str = "error";
/// Stage label of the interim event emitted while the artifact is fetched.
pub const STAGE_DOWNLOADING: &str = "downloading";

/// One event on the outbound stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Upstream event, unchanged
    Relay(Value),

    /// Remote finished; local download started
    Downloading { message: String },

    /// Artifact materialized locally
    Complete {
        output_path: String,
        filename: String,
        size_bytes: u64,
        message: String,
    },

    /// Bridge-side terminal failure
    Error {
        code: ErrorCode,
        message: String,
        details: Option<String>,
    },
}

impl StreamEvent {
    pub fn relay(payload: Value) -> Self {
        StreamEvent::Relay(payload)
    }

    pub fn downloading(message: impl Into<String>) -> Self {
        StreamEvent::Downloading {
            message: message.into(),
        }
    }

    pub fn complete(
        output_path: impl Into<String>,
        filename: impl Into<String>,
        size_bytes: u64,
        message: impl Into<String>,
    ) -> Self {
        StreamEvent::Complete {
            output_path: output_path.into(),
            filename: filename.into(),
            size_bytes,
            message: message.into(),
        }
    }

    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        StreamEvent::Error {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn error_with_details(
        code: ErrorCode,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        StreamEvent::Error {
            code,
            message: message.into(),
            details: Some(crate::responses::truncate_details(&details.into())),
        }
    }

    /// The `stage` field as it appears on the wire.
    pub fn stage(&self) -> Option<&str> {
        match self {
            StreamEvent::Relay(payload) => payload.get("stage").and_then(Value::as_str),
            StreamEvent::Downloading { .. } => Some(STAGE_DOWNLOADING),
            StreamEvent::Complete { .. } => Some(STAGE_COMPLETE),
            StreamEvent::Error { .. } => Some(STAGE_ERROR),
        }
    }

    /// Whether the stream ends after this event.
    ///
    /// A relayed upstream `error` is terminal; a relayed `complete` never
    /// reaches the client because the bridge intercepts it.
    pub fn is_terminal(&self) -> bool {
        match self {
            StreamEvent::Relay(_) => self.stage() == Some(STAGE_ERROR),
            StreamEvent::Downloading { .. } => false,
            StreamEvent::Complete { .. } | StreamEvent::Error { .. } => true,
        }
    }

    /// JSON body of the event.
    pub fn to_value(&self) -> Value {
        match self {
            StreamEvent::Relay(payload) => payload.clone(),
            StreamEvent::Downloading { message } => json!({
                "stage": STAGE_DOWNLOADING,
                "status": "processing",
                "progress": 100,
                "message": message,
            }),
            StreamEvent::Complete {
                output_path,
                filename,
                size_bytes,
                message,
            } => json!({
                "stage": STAGE_COMPLETE,
                "status": "complete",
                "progress": 100,
                "message": message,
                "output_path": output_path,
                "filename": filename,
                "size_bytes": size_bytes,
            }),
            StreamEvent::Error {
                code,
                message,
                details,
            } => {
                let mut body = json!({
                    "stage": STAGE_ERROR,
                    "status": "error",
                    "error": code,
                    "message": message,
                });
                if let Some(details) = details {
                    body["details"] = Value::String(details.clone());
                }
                body
            }
        }
    }
}

impl Serialize for StreamEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_is_verbatim() {
        let payload = json!({"stage": "tracking", "progress": 42, "extra": [1, 2]});
        let event = StreamEvent::relay(payload.clone());
        assert_eq!(event.to_value(), payload);
        assert_eq!(event.stage(), Some("tracking"));
        assert!(!event.is_terminal());
    }

    #[test]
    fn test_relayed_upstream_error_is_terminal() {
        let event = StreamEvent::relay(json!({"stage": "error", "error": "CUDA OOM"}));
        assert!(event.is_terminal());
    }

    #[test]
    fn test_complete_serialization() {
        let event = StreamEvent::complete("/abs/out.mp4", "out.mp4", 1024, "done");
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"stage\":\"complete\""));
        assert!(json.contains("\"output_path\":\"/abs/out.mp4\""));
        assert!(event.is_terminal());
    }

    #[test]
    fn test_error_carries_code() {
        let event = StreamEvent::error(ErrorCode::NoDownloadUrl, "stream ended");
        let value = event.to_value();
        assert_eq!(value["error"], "NO_DOWNLOAD_URL");
        assert!(value.get("details").is_none());
    }

    #[test]
    fn test_downloading_is_interim() {
        let event = StreamEvent::downloading("Downloading processed video...");
        assert_eq!(event.stage(), Some(STAGE_DOWNLOADING));
        assert!(!event.is_terminal());
    }
}
