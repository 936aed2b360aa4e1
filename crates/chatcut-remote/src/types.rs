//! Remote worker request/response payloads.
//!
//! Every field is optional on the wire; the interpreter decides what a
//! missing field means.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use chatcut_models::OutputRef;

/// `GET /health` body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthPayload {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub gpu: Option<Value>,
}

impl HealthPayload {
    /// GPU label as text; the worker sends a device string but may send
    /// anything JSON.
    pub fn gpu_label(&self) -> Option<String> {
        match &self.gpu {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        }
    }
}

/// `POST /start-job` body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartJobPayload {
    #[serde(default)]
    pub job_id: Option<Value>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl StartJobPayload {
    /// Non-empty job id, accepting strings and numbers.
    pub fn job_id(&self) -> Option<String> {
        match &self.job_id {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// A started remote job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedJob {
    pub job_id: String,
    pub status: String,
    pub message: String,
}

/// `GET /progress/{job_id}` body, also the shape of stream events.
///
/// Fields are kept as raw JSON and read one at a time, so a field of an
/// unexpected type never hides the others.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressPayload {
    #[serde(default)]
    pub status: Option<Value>,
    #[serde(default)]
    pub stage: Option<Value>,
    #[serde(default)]
    pub progress: Option<Value>,
    #[serde(default)]
    pub message: Option<Value>,
    #[serde(default)]
    pub download_url: Option<Value>,
    #[serde(default)]
    pub filename: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

impl ProgressPayload {
    /// Parse a stream event or progress body; `None` if it is not an object.
    pub fn from_event(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    /// `stage` label, only when it is a non-empty string.
    pub fn stage_label(&self) -> Option<&str> {
        label(&self.stage)
    }

    /// `status` label, only when it is a non-empty string.
    pub fn status_label(&self) -> Option<&str> {
        label(&self.status)
    }

    /// Message as text, whatever JSON type the worker used.
    pub fn message_text(&self) -> Option<String> {
        text(&self.message)
    }

    /// Reported percentage; numbers and numeric strings, else 0.
    pub fn progress_value(&self) -> f64 {
        match &self.progress {
            Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
            _ => 0.0,
        }
    }

    /// Error text from the `error` field.
    pub fn error_text(&self) -> Option<String> {
        text(&self.error)
    }

    /// Status after folding terminal stages in: stream events only carry
    /// `stage`, and the worker sets `status == stage` for terminal stages.
    pub fn effective_status(&self) -> String {
        match self.status_label().map(str::to_lowercase) {
            Some(status) => status,
            None => match self.stage_label().map(str::to_lowercase).as_deref() {
                Some("complete") => "complete".to_string(),
                Some("error") => "error".to_string(),
                _ => "processing".to_string(),
            },
        }
    }

    /// Download location, if the worker provided a usable one.
    ///
    /// A missing `filename` falls back to the last segment of the URL.
    pub fn output_ref(&self) -> Option<OutputRef> {
        let download_url = label(&self.download_url)?;

        let filename = label(&self.filename)
            .map(str::to_string)
            .or_else(|| {
                download_url
                    .split(['?', '#'])
                    .next()
                    .and_then(|path| path.rsplit('/').next())
                    .filter(|seg| !seg.is_empty())
                    .map(str::to_string)
            })?;

        Some(OutputRef {
            download_url: download_url.to_string(),
            filename,
        })
    }
}

fn label(value: &Option<Value>) -> Option<&str> {
    value
        .as_ref()
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn text(value: &Option<Value>) -> Option<String> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_job_id_accepts_numbers() {
        let payload: StartJobPayload = serde_json::from_value(json!({"job_id": 42})).unwrap();
        assert_eq!(payload.job_id().as_deref(), Some("42"));

        let payload: StartJobPayload = serde_json::from_value(json!({"job_id": "  "})).unwrap();
        assert!(payload.job_id().is_none());
    }

    #[test]
    fn test_progress_value_is_lenient() {
        let p: ProgressPayload = serde_json::from_value(json!({"progress": 55})).unwrap();
        assert_eq!(p.progress_value(), 55.0);
        let p: ProgressPayload = serde_json::from_value(json!({"progress": "12.5"})).unwrap();
        assert_eq!(p.progress_value(), 12.5);
        let p: ProgressPayload = serde_json::from_value(json!({"progress": null})).unwrap();
        assert_eq!(p.progress_value(), 0.0);
    }

    #[test]
    fn test_effective_status_from_stage() {
        let p = ProgressPayload::from_event(&json!({"stage": "complete"})).unwrap();
        assert_eq!(p.effective_status(), "complete");
        let p = ProgressPayload::from_event(&json!({"stage": "tracking"})).unwrap();
        assert_eq!(p.effective_status(), "processing");
        let p = ProgressPayload::from_event(&json!({"status": "Not_Found"})).unwrap();
        assert_eq!(p.effective_status(), "not_found");
    }

    #[test]
    fn test_output_ref_filename_fallback() {
        let p = ProgressPayload::from_event(&json!({"download_url": "/d/x.mp4?sig=1"})).unwrap();
        let output = p.output_ref().unwrap();
        assert_eq!(output.filename, "x.mp4");

        let p = ProgressPayload::from_event(&json!({"download_url": ""})).unwrap();
        assert!(p.output_ref().is_none());
    }

    #[test]
    fn test_from_event_rejects_non_objects() {
        assert!(ProgressPayload::from_event(&json!([1, 2])).is_none());
        assert!(ProgressPayload::from_event(&json!("complete")).is_none());
    }

    #[test]
    fn test_mistyped_fields_do_not_hide_the_rest() {
        let p = ProgressPayload::from_event(&json!({
            "stage": "complete",
            "status": 200,
            "download_url": "/d/x.mp4",
            "filename": "x.mp4",
            "message": {"text": "done"}
        }))
        .unwrap();
        assert_eq!(p.effective_status(), "complete");
        assert_eq!(p.output_ref().unwrap().download_url, "/d/x.mp4");
        assert_eq!(p.message_text().as_deref(), Some(r#"{"text":"done"}"#));

        let p = ProgressPayload::from_event(&json!({"stage": 5, "message": 7})).unwrap();
        assert_eq!(p.effective_status(), "processing");
        assert!(p.stage_label().is_none());
        assert_eq!(p.message_text().as_deref(), Some("7"));
    }

    #[test]
    fn test_gpu_label() {
        let h: HealthPayload = serde_json::from_value(json!({"status": "ok", "gpu": "cuda"})).unwrap();
        assert_eq!(h.gpu_label().as_deref(), Some("cuda"));
        let h: HealthPayload = serde_json::from_value(json!({"status": "ok"})).unwrap();
        assert!(h.gpu_label().is_none());
    }
}
