//! Client for the remote processing worker.
//!
//! The worker sits behind an HTTP tunnel and exposes a small contract:
//! health, job start, progress, artifact download and an optional event
//! stream. This crate normalizes the user-supplied endpoint, talks that
//! contract, interprets progress payloads and brings finished artifacts
//! onto local disk.

pub mod client;
pub mod config;
pub mod driver;
pub mod endpoint;
pub mod error;
pub mod fetch;
pub mod interstitial;
pub mod job;
pub mod progress;
pub mod stream;
pub mod types;

pub use client::JobClient;
pub use config::RemoteConfig;
pub use driver::JobDriver;
pub use endpoint::RemoteEndpoint;
pub use error::{RemoteError, RemoteResult};
pub use fetch::{artifact_file_name, ArtifactFetcher, DownloadedArtifact};
pub use interstitial::is_interstitial_page;
pub use job::{resolve_trim_window, JobSubmission};
pub use progress::{interpret, Interpretation, ProgressTracker};
pub use stream::{error_event, StreamBridge};
pub use types::StartedJob;
