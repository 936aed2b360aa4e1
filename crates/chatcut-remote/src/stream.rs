//! Live progress relay.
//!
//! Proxies the worker's `POST /process-stream` event stream to the local
//! client. Upstream events are forwarded unchanged except `complete`: that
//! one is held back until the artifact is on local disk, and the client
//! sees `downloading` followed by a `complete` carrying the local path.

use std::ops::ControlFlow;

use futures_util::StreamExt;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info, warn};

use chatcut_models::{ErrorCode, OutputRef, StreamEvent};

use crate::client::{upload_form, JobClient};
use crate::endpoint::RemoteEndpoint;
use crate::error::RemoteError;
use crate::fetch::ArtifactFetcher;
use crate::job::JobSubmission;
use crate::types::ProgressPayload;

const CHANNEL_CAPACITY: usize = 32;

/// Splits a byte stream into lines.
#[derive(Debug, Default)]
pub struct EventLineDecoder {
    buf: Vec<u8>,
}

impl EventLineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every line it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line);
            lines.push(text.trim_end_matches(['\n', '\r']).to_string());
        }
        lines
    }

    /// Whatever is left once the stream has ended.
    pub fn finish(self) -> Option<String> {
        let rest = String::from_utf8_lossy(&self.buf).trim().to_string();
        (!rest.is_empty()).then_some(rest)
    }
}

/// Parse one `data: {json}` line. Blank lines, comments, other SSE fields
/// and anything that is not a JSON object yield `None`.
pub fn parse_event_line(line: &str) -> Option<Value> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return None;
    }

    let data = match line.strip_prefix("data:") {
        Some(rest) => rest.trim_start(),
        None if line.starts_with('{') => line,
        None => return None,
    };

    match serde_json::from_str::<Value>(data) {
        Ok(value) if value.is_object() => Some(value),
        Ok(_) => None,
        Err(e) => {
            warn!(error = %e, "Skipping malformed stream event");
            None
        }
    }
}

/// What to do with one upstream event.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeAction {
    /// Pass through and keep reading
    Forward(StreamEvent),
    /// Remote finished; download the artifact and end
    Fetch {
        output: OutputRef,
        job_id: Option<String>,
    },
    /// Send and end the stream
    Finish(StreamEvent),
}

/// Decision logic of the bridge, free of I/O.
#[derive(Debug, Default)]
pub struct BridgeState {
    finished: bool,
}

impl BridgeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_event(&mut self, value: Value) -> BridgeAction {
        let Some(payload) = ProgressPayload::from_event(&value) else {
            return BridgeAction::Forward(StreamEvent::relay(value));
        };

        match terminal_stage(&payload) {
            Some("complete") => {
                self.finished = true;
                match payload.output_ref() {
                    Some(output) => BridgeAction::Fetch {
                        output,
                        job_id: value
                            .get("job_id")
                            .and_then(Value::as_str)
                            .map(str::to_string),
                    },
                    None => BridgeAction::Finish(StreamEvent::error(
                        ErrorCode::NoDownloadUrl,
                        "Job complete but no download URL provided",
                    )),
                }
            }
            Some(_) => {
                self.finished = true;
                BridgeAction::Finish(StreamEvent::relay(value))
            }
            None => BridgeAction::Forward(StreamEvent::relay(value)),
        }
    }

    /// Synthetic terminal event if upstream ended without one.
    pub fn on_end(&mut self) -> Option<StreamEvent> {
        if self.finished {
            return None;
        }
        self.finished = true;
        Some(StreamEvent::error(
            ErrorCode::NoDownloadUrl,
            "Stream ended without a download URL",
        ))
    }
}

fn terminal_stage(payload: &ProgressPayload) -> Option<&'static str> {
    let stage = payload.stage_label().map(str::to_lowercase);
    let status = payload.status_label().map(str::to_lowercase);

    for label in [stage.as_deref(), status.as_deref()].into_iter().flatten() {
        match label {
            "complete" => return Some("complete"),
            "error" | "failed" => return Some("error"),
            _ => {}
        }
    }
    None
}

/// Error event for a bridge-side failure.
pub fn error_event(err: &RemoteError) -> StreamEvent {
    match err.details() {
        Some(details) => StreamEvent::error_with_details(err.code(), err.to_string(), details),
        None => StreamEvent::error(err.code(), err.to_string()),
    }
}

/// Relays a remote event stream to one local client.
#[derive(Debug, Clone)]
pub struct StreamBridge {
    client: JobClient,
    fetcher: ArtifactFetcher,
}

impl StreamBridge {
    pub fn new(client: JobClient, fetcher: ArtifactFetcher) -> Self {
        Self { client, fetcher }
    }

    /// Start relaying in a background task.
    ///
    /// The returned stream always ends with a terminal event. Dropping it
    /// stops the relay; the remote job keeps running.
    pub fn open(
        &self,
        endpoint: RemoteEndpoint,
        submission: JobSubmission,
    ) -> ReceiverStream<StreamEvent> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let bridge = self.clone();

        tokio::spawn(async move {
            let deadline = bridge.client.stream_timeout();
            tokio::select! {
                _ = tx.closed() => {
                    info!("Stream client disconnected, stopping relay");
                }
                result = tokio::time::timeout(deadline, bridge.relay(&endpoint, &submission, &tx)) => {
                    if result.is_err() {
                        warn!(timeout_secs = deadline.as_secs(), "Stream exceeded its deadline");
                        let _ = tx
                            .send(StreamEvent::error(
                                ErrorCode::Timeout,
                                format!("Stream timed out after {} seconds", deadline.as_secs()),
                            ))
                            .await;
                    }
                }
            }
        });

        ReceiverStream::new(rx)
    }

    async fn relay(
        &self,
        endpoint: &RemoteEndpoint,
        submission: &JobSubmission,
        tx: &mpsc::Sender<StreamEvent>,
    ) {
        let response = match self.connect(endpoint, submission).await {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "Failed to open Colab stream");
                let _ = tx.send(error_event(&e)).await;
                return;
            }
        };

        let mut state = BridgeState::new();
        let mut decoder = EventLineDecoder::new();
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    error!(error = %e, "Colab stream interrupted");
                    let _ = tx
                        .send(StreamEvent::error(
                            ErrorCode::StreamError,
                            format!("Stream interrupted: {}", e),
                        ))
                        .await;
                    return;
                }
            };

            for line in decoder.push(&chunk) {
                if self
                    .handle_line(&line, &mut state, endpoint, submission, tx)
                    .await
                    .is_break()
                {
                    return;
                }
            }
        }

        if let Some(line) = decoder.finish() {
            if self
                .handle_line(&line, &mut state, endpoint, submission, tx)
                .await
                .is_break()
            {
                return;
            }
        }

        if let Some(event) = state.on_end() {
            warn!("Colab stream ended without a terminal event");
            let _ = tx.send(event).await;
        }
    }

    async fn connect(
        &self,
        endpoint: &RemoteEndpoint,
        submission: &JobSubmission,
    ) -> Result<reqwest::Response, RemoteError> {
        let http = self.client.http(endpoint)?;
        let url = endpoint.url("/process-stream");
        let form = upload_form(submission).await?;

        info!(url = %url, file = %submission.upload_file_name(), "Opening Colab stream");

        let response = http.post(&url).multipart(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::ServerError {
                status: status.as_u16(),
                body,
            });
        }

        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.to_ascii_lowercase().starts_with("text/html"));
        if is_html {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::unparseable(&body));
        }

        Ok(response)
    }

    async fn handle_line(
        &self,
        line: &str,
        state: &mut BridgeState,
        endpoint: &RemoteEndpoint,
        submission: &JobSubmission,
        tx: &mpsc::Sender<StreamEvent>,
    ) -> ControlFlow<()> {
        let Some(value) = parse_event_line(line) else {
            return ControlFlow::Continue(());
        };

        match state.on_event(value) {
            BridgeAction::Forward(event) => {
                if tx.send(event).await.is_err() {
                    debug!("Stream receiver dropped");
                    return ControlFlow::Break(());
                }
                ControlFlow::Continue(())
            }
            BridgeAction::Finish(event) => {
                let _ = tx.send(event).await;
                ControlFlow::Break(())
            }
            BridgeAction::Fetch { output, job_id } => {
                if tx
                    .send(StreamEvent::downloading("Downloading processed video..."))
                    .await
                    .is_err()
                {
                    return ControlFlow::Break(());
                }

                let hint = submission
                    .source_path()
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned());
                let event = match self
                    .fetcher
                    .fetch(endpoint, &output, job_id.as_deref(), hint.as_deref())
                    .await
                {
                    Ok(artifact) => StreamEvent::complete(
                        artifact.path_string(),
                        artifact.file_name(),
                        artifact.size_bytes,
                        "Processing complete!",
                    ),
                    Err(e) => error_event(&e),
                };
                let _ = tx.send(event).await;
                ControlFlow::Break(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decoder_handles_split_chunks() {
        let mut decoder = EventLineDecoder::new();
        assert!(decoder.push(b"data: {\"stage\":").is_empty());
        let lines = decoder.push(b" \"tracking\"}\r\n\ndata: {}\n");
        assert_eq!(lines, vec!["data: {\"stage\": \"tracking\"}", "", "data: {}"]);
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn test_decoder_finish_returns_tail() {
        let mut decoder = EventLineDecoder::new();
        decoder.push(b"data: {\"stage\":\"complete\"}");
        assert_eq!(decoder.finish().as_deref(), Some("data: {\"stage\":\"complete\"}"));
    }

    #[test]
    fn test_parse_event_line() {
        assert_eq!(
            parse_event_line("data: {\"stage\":\"tracking\",\"progress\":10}"),
            Some(json!({"stage": "tracking", "progress": 10}))
        );
        assert_eq!(parse_event_line("data:{\"a\":1}"), Some(json!({"a": 1})));
        assert_eq!(parse_event_line("{\"a\":1}"), Some(json!({"a": 1})));
        assert!(parse_event_line("").is_none());
        assert!(parse_event_line(": keep-alive").is_none());
        assert!(parse_event_line("event: progress").is_none());
        assert!(parse_event_line("data: {not json").is_none());
        assert!(parse_event_line("data: [1,2]").is_none());
    }

    #[test]
    fn test_state_forwards_progress() {
        let mut state = BridgeState::new();
        let event = json!({"stage": "tracking", "progress": 30});
        assert_eq!(
            state.on_event(event.clone()),
            BridgeAction::Forward(StreamEvent::relay(event))
        );
        assert!(state.on_end().is_some());
    }

    #[test]
    fn test_state_intercepts_complete() {
        let mut state = BridgeState::new();
        let action = state.on_event(json!({
            "stage": "complete",
            "download_url": "/d/x.mp4",
            "filename": "x.mp4",
            "job_id": "j1"
        }));
        match action {
            BridgeAction::Fetch { output, job_id } => {
                assert_eq!(output.download_url, "/d/x.mp4");
                assert_eq!(job_id.as_deref(), Some("j1"));
            }
            other => panic!("unexpected action: {:?}", other),
        }
        assert!(state.on_end().is_none());
    }

    #[test]
    fn test_state_intercepts_complete_despite_odd_fields() {
        let mut state = BridgeState::new();
        let action = state.on_event(json!({
            "stage": "complete",
            "status": 200,
            "download_url": "/d/x.mp4",
            "filename": "x.mp4",
            "message": {"text": "done"}
        }));
        match action {
            BridgeAction::Fetch { output, .. } => assert_eq!(output.filename, "x.mp4"),
            other => panic!("unexpected action: {:?}", other),
        }
        assert!(state.on_end().is_none());
    }

    #[test]
    fn test_state_complete_without_url() {
        let mut state = BridgeState::new();
        match state.on_event(json!({"stage": "complete"})) {
            BridgeAction::Finish(StreamEvent::Error { code, .. }) => {
                assert_eq!(code, ErrorCode::NoDownloadUrl)
            }
            other => panic!("unexpected action: {:?}", other),
        }
    }

    #[test]
    fn test_state_relays_upstream_error() {
        let mut state = BridgeState::new();
        let event = json!({"stage": "error", "message": "boom"});
        assert_eq!(
            state.on_event(event.clone()),
            BridgeAction::Finish(StreamEvent::relay(event))
        );
    }

    #[test]
    fn test_state_synthesizes_end_error() {
        let mut state = BridgeState::new();
        state.on_event(json!({"stage": "tracking"}));
        match state.on_end() {
            Some(StreamEvent::Error { code, .. }) => assert_eq!(code, ErrorCode::NoDownloadUrl),
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(state.on_end().is_none());
    }
}
