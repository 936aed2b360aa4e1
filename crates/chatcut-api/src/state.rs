//! Application state.

use std::sync::Arc;

use chatcut_media::TrimCache;
use chatcut_remote::{ArtifactFetcher, JobClient, JobDriver, StreamBridge};

use crate::config::ApiConfig;

/// Shared application state.
///
/// Holds configuration and stateless collaborators only; there is no job
/// table, the remote worker owns job state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub client: Arc<JobClient>,
    pub driver: Arc<JobDriver>,
    pub bridge: Arc<StreamBridge>,
    pub trim_cache: Arc<TrimCache>,
}

impl AppState {
    /// Create state that trims with the system ffmpeg.
    pub fn new(config: ApiConfig) -> Self {
        let trim_cache = TrimCache::with_ffmpeg(&config.trim);
        Self::with_trim_cache(config, trim_cache)
    }

    /// Create state around a given trim cache.
    pub fn with_trim_cache(config: ApiConfig, trim_cache: TrimCache) -> Self {
        let client = JobClient::new(config.remote.clone());
        let fetcher = ArtifactFetcher::new(client.clone());

        Self {
            driver: Arc::new(JobDriver::new(client.clone(), fetcher.clone())),
            bridge: Arc::new(StreamBridge::new(client.clone(), fetcher)),
            client: Arc::new(client),
            trim_cache: Arc::new(trim_cache),
            config,
        }
    }
}
