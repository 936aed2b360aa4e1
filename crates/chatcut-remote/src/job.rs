//! Validated job submissions.
//!
//! Input validation and trim-window defaults both live here so the rest of
//! the pipeline only ever sees a checked submission.

use std::path::{Path, PathBuf};

use chatcut_models::{TrimWindow, TrimWindowError};

use crate::error::{RemoteError, RemoteResult};

/// MIME type sent with the upload when the extension is not recognised.
pub const DEFAULT_VIDEO_MIME: &str = "video/mp4";

/// A checked request to run a remote job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSubmission {
    source_path: PathBuf,
    upload_path: PathBuf,
    prompt: String,
    trim_window: Option<TrimWindow>,
}

impl JobSubmission {
    /// Validate raw request input.
    ///
    /// Fails with `FILE_NOT_FOUND` for a missing path, `FILE_ACCESS_ERROR`
    /// when the file cannot be opened, and `INVALID_REQUEST` for an empty
    /// prompt or a malformed trim window.
    pub async fn prepare(
        file_path: &str,
        prompt: &str,
        trim_start: Option<f64>,
        trim_end: Option<f64>,
    ) -> RemoteResult<Self> {
        let file_path = file_path.trim();
        if file_path.is_empty() {
            return Err(RemoteError::invalid_request("file_path is required"));
        }
        let source_path = PathBuf::from(file_path);

        check_readable(&source_path).await?;

        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(RemoteError::invalid_request("prompt is required"));
        }

        let trim_window = resolve_trim_window(trim_start, trim_end)
            .map_err(|e| RemoteError::invalid_request(e.to_string()))?;

        Ok(Self {
            upload_path: source_path.clone(),
            source_path,
            prompt: prompt.to_string(),
            trim_window,
        })
    }

    /// File the user pointed at.
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// File that will actually be uploaded (the trimmed clip, if any).
    pub fn upload_path(&self) -> &Path {
        &self.upload_path
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn trim_window(&self) -> Option<TrimWindow> {
        self.trim_window
    }

    /// Upload the trimmed clip instead of the source.
    pub fn with_upload_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.upload_path = path.into();
        self
    }

    /// Multipart filename of the upload.
    pub fn upload_file_name(&self) -> String {
        self.upload_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video.mp4".to_string())
    }
}

/// Apply trim defaults: no bounds means no trim, an end alone starts at 0,
/// a start alone is rejected.
pub fn resolve_trim_window(
    trim_start: Option<f64>,
    trim_end: Option<f64>,
) -> Result<Option<TrimWindow>, TrimWindowError> {
    match (trim_start, trim_end) {
        (None, None) => Ok(None),
        (None, Some(end)) => TrimWindow::new(0.0, end).map(Some),
        (Some(start), Some(end)) => TrimWindow::new(start, end).map(Some),
        (Some(_), None) => Err(TrimWindowError::MissingEnd),
    }
}

/// Video MIME type from a file extension.
pub fn video_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("mp4") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("m4v") => "video/x-m4v",
        Some("mkv") => "video/x-matroska",
        Some("webm") => "video/webm",
        Some("avi") => "video/x-msvideo",
        _ => DEFAULT_VIDEO_MIME,
    }
}

async fn check_readable(path: &Path) -> RemoteResult<()> {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(RemoteError::FileNotFound(path.to_path_buf()))
        }
        Err(e) => {
            return Err(RemoteError::FileAccess {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    if !metadata.is_file() {
        return Err(RemoteError::FileAccess {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
        });
    }

    tokio::fs::File::open(path)
        .await
        .map(|_| ())
        .map_err(|e| RemoteError::FileAccess {
            path: path.to_path_buf(),
            source: e,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatcut_models::ErrorCode;

    #[test]
    fn test_trim_defaults() {
        assert_eq!(resolve_trim_window(None, None), Ok(None));

        let window = resolve_trim_window(None, Some(4.0)).unwrap().unwrap();
        assert_eq!(window.start_sec, 0.0);
        assert_eq!(window.end_sec, 4.0);

        assert_eq!(
            resolve_trim_window(Some(1.0), None),
            Err(TrimWindowError::MissingEnd)
        );
        assert!(resolve_trim_window(Some(5.0), Some(5.001)).is_err());
    }

    #[test]
    fn test_trim_window_is_rounded() {
        let window = resolve_trim_window(Some(1.234), Some(5.678)).unwrap().unwrap();
        assert_eq!(window.start_sec, 1.23);
        assert_eq!(window.end_sec, 5.68);
    }

    #[test]
    fn test_mime_types() {
        assert_eq!(video_mime_type(Path::new("a.MOV")), "video/quicktime");
        assert_eq!(video_mime_type(Path::new("a.mp4")), "video/mp4");
        assert_eq!(video_mime_type(Path::new("a.bin")), DEFAULT_VIDEO_MIME);
        assert_eq!(video_mime_type(Path::new("noext")), DEFAULT_VIDEO_MIME);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = JobSubmission::prepare("/definitely/not/here.mp4", "blur faces", None, None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::FileNotFound);
    }

    #[tokio::test]
    async fn test_directory_is_not_accessible() {
        let dir = tempfile::tempdir().unwrap();
        let err = JobSubmission::prepare(dir.path().to_str().unwrap(), "x", None, None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::FileAccessError);
    }

    #[tokio::test]
    async fn test_empty_prompt() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = JobSubmission::prepare(file.path().to_str().unwrap(), "   ", None, None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[tokio::test]
    async fn test_prepare_and_swap_upload() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("clip.mov");
        std::fs::write(&source, b"data").unwrap();

        let submission =
            JobSubmission::prepare(source.to_str().unwrap(), " track the dog ", None, Some(3.0))
                .await
                .unwrap();
        assert_eq!(submission.prompt(), "track the dog");
        assert_eq!(submission.upload_path(), source.as_path());
        assert_eq!(submission.trim_window().unwrap().start_sec, 0.0);

        let trimmed = submission.with_upload_path(dir.path().join("clip_trim.mov"));
        assert_eq!(trimmed.upload_file_name(), "clip_trim.mov");
        assert_eq!(trimmed.source_path(), source.as_path());
    }
}
