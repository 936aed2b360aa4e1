//! FFmpeg CLI wrapper for local clip preparation.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Frame-rate probing via ffprobe
//! - A filesystem-backed cache of keyframe-aligned trimmed clips

pub mod command;
pub mod error;
pub mod probe;
pub mod trim;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use probe::{parse_frame_rate, probe_frame_rate, DEFAULT_FPS};
pub use trim::{cache_file_name, Encoder, FfmpegEncoder, TrimCache, TrimConfig, TrimJob};
