//! Shared data models for the ChatCut remote-job bridge.
//!
//! This crate provides Serde-serializable types for:
//! - Error codes returned to the plugin
//! - Job status and trim windows
//! - Progress snapshots
//! - Request bodies accepted from the plugin
//! - Response bodies and outbound stream events

pub mod error_code;
pub mod job;
pub mod progress;
pub mod requests;
pub mod responses;
pub mod stream;

// Re-export common types
pub use error_code::ErrorCode;
pub use job::{round_centis, JobStatus, TrimWindow, TrimWindowError};
pub use progress::{clamp_progress, OutputRef, ProgressSnapshot};
pub use requests::{HealthRequest, PingRequest, PingResponse, ProgressRequest, StartJobRequest};
pub use responses::{truncate_details, HealthStatus, ProgressResponse, StartJobResponse};
pub use stream::StreamEvent;
