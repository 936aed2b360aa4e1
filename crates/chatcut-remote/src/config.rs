//! Remote client configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Timeouts and local layout for talking to the remote worker.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// `GET /health`
    pub health_timeout: Duration,
    /// `POST /start-job`, uploads can be large
    pub start_timeout: Duration,
    /// `GET /progress/{job_id}`
    pub poll_timeout: Duration,
    /// Artifact download
    pub download_timeout: Duration,
    /// Whole event stream, and the synchronous driver's overall deadline
    pub stream_timeout: Duration,
    /// TCP connect bound for every request
    pub connect_timeout: Duration,
    /// Delay between polls in the synchronous driver
    pub poll_interval: Duration,
    /// Consecutive failed polls tolerated by the synchronous driver
    pub max_poll_failures: u32,
    /// Where downloaded artifacts land
    pub output_dir: PathBuf,
    /// Prefix of downloaded artifact names
    pub output_prefix: String,
    pub user_agent: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            health_timeout: Duration::from_secs(10),
            start_timeout: Duration::from_secs(120),
            poll_timeout: Duration::from_secs(30),
            download_timeout: Duration::from_secs(300),
            stream_timeout: Duration::from_secs(600), // 10 minutes
            connect_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(2000),
            max_poll_failures: 3,
            output_dir: PathBuf::from("output"),
            output_prefix: "colab".to_string(),
            user_agent: "ChatCut-Backend/1.0".to_string(),
        }
    }
}

impl RemoteConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            health_timeout: env_secs("COLAB_HEALTH_TIMEOUT").unwrap_or(defaults.health_timeout),
            start_timeout: env_secs("COLAB_START_TIMEOUT").unwrap_or(defaults.start_timeout),
            poll_timeout: env_secs("COLAB_POLL_TIMEOUT").unwrap_or(defaults.poll_timeout),
            download_timeout: env_secs("COLAB_DOWNLOAD_TIMEOUT")
                .unwrap_or(defaults.download_timeout),
            stream_timeout: env_secs("COLAB_STREAM_TIMEOUT").unwrap_or(defaults.stream_timeout),
            connect_timeout: defaults.connect_timeout,
            poll_interval: std::env::var("COLAB_POLL_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            max_poll_failures: std::env::var("COLAB_MAX_POLL_FAILURES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_poll_failures),
            output_dir: std::env::var("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            output_prefix: std::env::var("COLAB_OUTPUT_PREFIX")
                .unwrap_or(defaults.output_prefix),
            user_agent: defaults.user_agent,
        }
    }
}

fn env_secs(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs)
}
