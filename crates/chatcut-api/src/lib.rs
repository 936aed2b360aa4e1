//! Axum HTTP server for the ChatCut editor plugin.
//!
//! This crate provides:
//! - Start, progress and health proxies for the remote worker
//! - Synchronous processing that waits for the artifact
//! - Server-sent event relay of the worker's progress stream
//! - Local trimming before upload

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
