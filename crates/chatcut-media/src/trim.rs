//! Keyframe-aligned trim cache.
//!
//! A trimmed clip is re-encoded once per `(source, window)` and then reused.
//! The cache directory is flat and has no index: a file at the key path is
//! the cache entry. Encodes write to a temp file in the same directory and
//! are renamed into place, so a file at the key path is always complete.
//! Two concurrent encodes of the same key both succeed; the last rename wins.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use chatcut_models::TrimWindow;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::{probe_frame_rate, DEFAULT_FPS};

/// Containers that accept H.264/AAC; anything else is written as mp4.
const KEEP_EXTENSIONS: &[&str] = &["mp4", "mov", "m4v", "mkv"];

/// Trim cache configuration.
#[derive(Debug, Clone)]
pub struct TrimConfig {
    /// Flat directory holding trimmed clips
    pub cache_dir: PathBuf,
    /// Hard limit for a single encode
    pub encode_timeout: Duration,
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("output/trim_cache"),
            encode_timeout: Duration::from_secs(600),
        }
    }
}

impl TrimConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            cache_dir: std::env::var("TRIM_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("output/trim_cache")),
            encode_timeout: Duration::from_secs(
                std::env::var("FFMPEG_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(600),
            ),
        }
    }
}

/// One re-encode request.
#[derive(Debug, Clone)]
pub struct TrimJob {
    pub source: PathBuf,
    pub output: PathBuf,
    pub window: TrimWindow,
    /// Source frame rate; also the output rate
    pub fps: f64,
}

impl TrimJob {
    /// One keyframe per second of video.
    pub fn gop_size(&self) -> u32 {
        (self.fps.round() as u32).max(1)
    }

    /// CFR, fixed GOP, no B-frames, 48 kHz audio.
    pub fn to_command(&self) -> FfmpegCommand {
        let gop = self.gop_size().to_string();

        FfmpegCommand::new(&self.source, &self.output)
            .seek(self.window.start_sec)
            .duration(self.window.duration())
            .video_codec("libx264")
            .preset("veryfast")
            .crf(18)
            .output_args([
                "-pix_fmt",
                "yuv420p",
                "-profile:v",
                "high",
                "-level",
                "4.1",
            ])
            .output_arg("-r")
            .output_arg(format!("{:.3}", self.fps))
            .output_args(["-g", gop.as_str(), "-keyint_min", gop.as_str()])
            .output_args(["-bf", "0", "-sc_threshold", "0", "-vsync", "cfr"])
            .output_args(["-video_track_timescale", "90000"])
            .audio_codec("aac")
            .audio_bitrate("192k")
            .output_args(["-ar", "48000"])
            .output_args(["-movflags", "+faststart"])
    }
}

/// External encoder invocation contract.
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Source frame rate, if it can be determined.
    async fn frame_rate(&self, source: &Path) -> Option<f64>;

    /// Produce `job.output`; must return only once the file is fully written.
    async fn encode(&self, job: &TrimJob) -> MediaResult<()>;
}

/// Encoder backed by the `ffmpeg`/`ffprobe` binaries.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    runner: FfmpegRunner,
}

impl FfmpegEncoder {
    pub fn new(timeout: Duration) -> Self {
        Self {
            runner: FfmpegRunner::new(timeout),
        }
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    async fn frame_rate(&self, source: &Path) -> Option<f64> {
        match probe_frame_rate(source).await {
            Ok(fps) => Some(fps),
            Err(e) => {
                warn!(path = %source.display(), "Frame rate probe failed: {}", e);
                None
            }
        }
    }

    async fn encode(&self, job: &TrimJob) -> MediaResult<()> {
        self.runner.run(&job.to_command()).await
    }
}

/// Filesystem-backed cache of trimmed clips.
#[derive(Clone)]
pub struct TrimCache {
    cache_dir: PathBuf,
    encoder: Arc<dyn Encoder>,
}

impl TrimCache {
    pub fn new(config: &TrimConfig, encoder: Arc<dyn Encoder>) -> Self {
        Self {
            cache_dir: config.cache_dir.clone(),
            encoder,
        }
    }

    /// Cache that shells out to ffmpeg.
    pub fn with_ffmpeg(config: &TrimConfig) -> Self {
        Self::new(config, Arc::new(FfmpegEncoder::new(config.encode_timeout)))
    }

    /// Return a trimmed copy of `source`, encoding it only on a cache miss.
    pub async fn ensure_trimmed(&self, source: &Path, window: TrimWindow) -> MediaResult<PathBuf> {
        let canonical = match tokio::fs::canonicalize(source).await {
            Ok(path) => path,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(MediaError::FileNotFound(source.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };

        let target = self.cache_dir.join(cache_file_name(&canonical, &window));

        if is_file(&target).await {
            debug!(path = %target.display(), "Trim cache hit");
            return Ok(target);
        }

        tokio::fs::create_dir_all(&self.cache_dir).await?;

        let fps = self
            .encoder
            .frame_rate(&canonical)
            .await
            .unwrap_or(DEFAULT_FPS);

        let temp = tempfile::Builder::new()
            .prefix(".trim-")
            .suffix(&format!(".{}", output_extension(&canonical)))
            .tempfile_in(&self.cache_dir)?
            .into_temp_path();

        let job = TrimJob {
            source: canonical,
            output: temp.to_path_buf(),
            window,
            fps,
        };

        info!(
            source = %job.source.display(),
            window = %window,
            fps = fps,
            "Trimming clip"
        );

        // temp is removed on drop if the encode fails
        self.encoder.encode(&job).await?;

        temp.persist(&target).map_err(|e| MediaError::Io(e.error))?;

        info!(path = %target.display(), "Trimmed clip cached");
        Ok(target)
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

fn output_extension(source: &Path) -> String {
    source
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .filter(|e| KEEP_EXTENSIONS.contains(&e.as_str()))
        .unwrap_or_else(|| "mp4".to_string())
}

/// Deterministic cache filename: `{stem}_{hash}_{start:.2}_{end:.2}.{ext}`.
///
/// `hash` is the first 8 hex digits of SHA-256 over the absolute source
/// path, so same-named files in different directories never share a key.
pub fn cache_file_name(absolute_source: &Path, window: &TrimWindow) -> String {
    let stem = absolute_source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "clip".to_string());

    let digest = Sha256::digest(absolute_source.to_string_lossy().as_bytes());
    let hash: String = digest.iter().take(4).map(|b| format!("{:02x}", b)).collect();

    format!(
        "{}_{}_{:.2}_{:.2}.{}",
        stem,
        hash,
        window.start_sec,
        window.end_sec,
        output_extension(absolute_source)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEncoder {
        calls: AtomicUsize,
        fps: Option<f64>,
        fail: bool,
    }

    impl CountingEncoder {
        fn new(fps: Option<f64>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fps,
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new(Some(30.0))
            }
        }
    }

    #[async_trait]
    impl Encoder for CountingEncoder {
        async fn frame_rate(&self, _source: &Path) -> Option<f64> {
            self.fps
        }

        async fn encode(&self, job: &TrimJob) -> MediaResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(MediaError::ffmpeg_failed(
                    "FFmpeg exited with non-zero status",
                    Some("Invalid data found when processing input".to_string()),
                    Some(1),
                ));
            }
            tokio::fs::write(&job.output, format!("gop={}", job.gop_size())).await?;
            Ok(())
        }
    }

    fn setup() -> (tempfile::TempDir, PathBuf, TrimConfig) {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("interview.mp4");
        std::fs::write(&source, b"source bytes").unwrap();
        let config = TrimConfig {
            cache_dir: dir.path().join("trim_cache"),
            ..TrimConfig::default()
        };
        (dir, source, config)
    }

    #[tokio::test]
    async fn test_second_call_is_cache_hit() {
        let (_dir, source, config) = setup();
        let encoder = Arc::new(CountingEncoder::new(Some(25.0)));
        let cache = TrimCache::new(&config, encoder.clone());
        let window = TrimWindow::new(1.0, 4.5).unwrap();

        let first = cache.ensure_trimmed(&source, window).await.unwrap();
        let second = cache.ensure_trimmed(&source, window).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(encoder.calls.load(Ordering::SeqCst), 1);
        assert_eq!(std::fs::read_to_string(&first).unwrap(), "gop=25");
        let name = first.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("interview_"));
        assert!(name.ends_with("_1.00_4.50.mp4"));
    }

    #[tokio::test]
    async fn test_default_fps_when_probe_fails() {
        let (_dir, source, config) = setup();
        let encoder = Arc::new(CountingEncoder::new(None));
        let cache = TrimCache::new(&config, encoder);

        let path = cache
            .ensure_trimmed(&source, TrimWindow::new(0.0, 1.0).unwrap())
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "gop=30");
    }

    #[tokio::test]
    async fn test_failed_encode_leaves_no_entry() {
        let (_dir, source, config) = setup();
        let encoder = Arc::new(CountingEncoder::failing());
        let cache = TrimCache::new(&config, encoder);

        let err = cache
            .ensure_trimmed(&source, TrimWindow::new(0.0, 1.0).unwrap())
            .await
            .unwrap_err();
        assert!(err.diagnostic().unwrap().contains("Invalid data"));

        let leftovers: Vec<_> = std::fs::read_dir(&config.cache_dir).unwrap().collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_missing_source() {
        let (dir, _source, config) = setup();
        let cache = TrimCache::new(&config, Arc::new(CountingEncoder::new(None)));

        let err = cache
            .ensure_trimmed(&dir.path().join("gone.mp4"), TrimWindow::new(0.0, 1.0).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }

    #[test]
    fn test_cache_key_distinguishes_directories() {
        let window = TrimWindow::new(0.0, 2.0).unwrap();
        let a = cache_file_name(Path::new("/a/clip.mov"), &window);
        let b = cache_file_name(Path::new("/b/clip.mov"), &window);
        assert_ne!(a, b);
        assert_eq!(a, cache_file_name(Path::new("/a/clip.mov"), &window));
        assert!(a.ends_with("_0.00_2.00.mov"));
    }

    #[test]
    fn test_unsupported_container_becomes_mp4() {
        let window = TrimWindow::new(0.0, 2.0).unwrap();
        assert!(cache_file_name(Path::new("/a/clip.webm"), &window).ends_with(".mp4"));
    }

    #[test]
    fn test_trim_command_alignment() {
        let job = TrimJob {
            source: PathBuf::from("/in.mp4"),
            output: PathBuf::from("/out.mp4"),
            window: TrimWindow::new(2.0, 5.0).unwrap(),
            fps: 29.97,
        };
        let args = job.to_command().build_args();
        let value_after = |flag: &str| {
            let idx = args.iter().position(|a| a == flag).unwrap();
            args[idx + 1].clone()
        };

        assert_eq!(value_after("-g"), "30");
        assert_eq!(value_after("-keyint_min"), "30");
        assert_eq!(value_after("-bf"), "0");
        assert_eq!(value_after("-ar"), "48000");
        assert_eq!(value_after("-ss"), "2.000");
        assert_eq!(value_after("-t"), "3.000");
    }
}
