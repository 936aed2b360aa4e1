//! Request bodies accepted from the plugin.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Start a job (also the body of synchronous and streaming processing).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StartJobRequest {
    /// Local path of the source video
    pub file_path: String,
    pub prompt: String,
    /// Remote worker base URL as the user pasted it
    pub colab_url: String,
    #[serde(default)]
    pub trim_start: Option<f64>,
    #[serde(default)]
    pub trim_end: Option<f64>,
}

/// Check a job's progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProgressRequest {
    pub job_id: String,
    pub colab_url: String,
    /// Name of the source clip, used to name the downloaded artifact
    #[serde(default)]
    pub original_filename: Option<String>,
}

/// Check the remote worker's health.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HealthRequest {
    pub colab_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PingRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PingResponse {
    pub status: String,
    pub received: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_trim_fields_are_optional() {
        let req: StartJobRequest = serde_json::from_value(json!({
            "file_path": "/tmp/a.mp4",
            "prompt": "zoom in",
            "colab_url": "abc.ngrok-free.app"
        }))
        .unwrap();
        assert!(req.trim_start.is_none());
        assert!(req.trim_end.is_none());
    }

    #[test]
    fn test_ping_message_defaults_to_empty() {
        let req: PingRequest = serde_json::from_value(json!({})).unwrap();
        assert_eq!(req.message, "");
    }
}
