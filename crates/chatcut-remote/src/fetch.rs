//! Artifact download.

use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{error, info};

use chatcut_models::OutputRef;

use crate::client::JobClient;
use crate::endpoint::RemoteEndpoint;
use crate::error::{RemoteError, RemoteResult};

/// A completed job's output on local disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedArtifact {
    /// Absolute path
    pub local_path: PathBuf,
    pub size_bytes: u64,
}

impl DownloadedArtifact {
    pub fn file_name(&self) -> String {
        self.local_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn path_string(&self) -> String {
        self.local_path.to_string_lossy().into_owned()
    }
}

/// Downloads finished artifacts into the output directory.
#[derive(Debug, Clone)]
pub struct ArtifactFetcher {
    client: JobClient,
}

impl ArtifactFetcher {
    pub fn new(client: JobClient) -> Self {
        Self { client }
    }

    pub fn output_dir(&self) -> &Path {
        &self.client.config().output_dir
    }

    /// Download `output` once.
    ///
    /// The local name is derived from `name_hint` (usually the original
    /// filename) and `job_id`; if that file is already on disk it is
    /// returned without downloading again. Every failure is
    /// `DOWNLOAD_FAILED`, independent of the job's own status.
    pub async fn fetch(
        &self,
        endpoint: &RemoteEndpoint,
        output: &OutputRef,
        job_id: Option<&str>,
        name_hint: Option<&str>,
    ) -> RemoteResult<DownloadedArtifact> {
        let config = self.client.config();
        let output_dir = &config.output_dir;

        tokio::fs::create_dir_all(output_dir).await.map_err(|e| {
            error!(dir = %output_dir.display(), error = %e, "Failed to create output directory");
            RemoteError::download_failed(format!("Failed to create output directory: {}", e))
        })?;

        let file_name =
            artifact_file_name(&config.output_prefix, name_hint, &output.filename, job_id);
        let target = output_dir.join(&file_name);

        if let Ok(meta) = tokio::fs::metadata(&target).await {
            if meta.is_file() && meta.len() > 0 {
                info!(path = %target.display(), "Artifact already downloaded");
                return finish(&target, meta.len()).await;
            }
        }

        let url = endpoint.resolve(&output.download_url);
        info!(url = %url, "Downloading artifact");

        let http = self
            .client
            .http(endpoint)
            .map_err(|e| RemoteError::download_failed(e.to_string()))?;
        let response = http
            .get(&url)
            .timeout(config.download_timeout)
            .send()
            .await
            .map_err(|e| {
                error!(url = %url, error = %e, "Network error downloading artifact");
                RemoteError::download_failed(format!("Failed to connect: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            error!(url = %url, status = status.as_u16(), "Download failed");
            return Err(RemoteError::download_failed(format!(
                "Download returned {}",
                status.as_u16()
            )));
        }

        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.to_ascii_lowercase().starts_with("text/html"));
        if is_html {
            return Err(RemoteError::download_failed(
                "Received an HTML page instead of the artifact",
            ));
        }

        let partial = output_dir.join(format!(".{}.{}.part", file_name, uuid::Uuid::new_v4()));
        let written = match write_body(response, &partial).await {
            Ok(n) => n,
            Err(e) => {
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(e);
            }
        };

        if written == 0 {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(RemoteError::download_failed("Downloaded artifact is empty"));
        }

        if let Err(e) = tokio::fs::rename(&partial, &target).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(RemoteError::download_failed(format!(
                "Failed to write artifact: {}",
                e
            )));
        }

        let artifact = finish(&target, written).await?;
        info!(
            path = %artifact.local_path.display(),
            size_bytes = artifact.size_bytes,
            "Artifact downloaded"
        );
        Ok(artifact)
    }
}

async fn write_body(response: reqwest::Response, path: &Path) -> RemoteResult<u64> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| RemoteError::download_failed(format!("Failed to write artifact: {}", e)))?;

    let mut written = 0u64;
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk
            .map_err(|e| RemoteError::download_failed(format!("Download interrupted: {}", e)))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| RemoteError::download_failed(format!("Failed to write artifact: {}", e)))?;
        written += chunk.len() as u64;
    }

    file.flush()
        .await
        .map_err(|e| RemoteError::download_failed(format!("Failed to write artifact: {}", e)))?;

    Ok(written)
}

async fn finish(path: &Path, size_bytes: u64) -> RemoteResult<DownloadedArtifact> {
    let local_path = tokio::fs::canonicalize(path)
        .await
        .map_err(|e| RemoteError::download_failed(format!("Failed to resolve artifact path: {}", e)))?;
    Ok(DownloadedArtifact {
        local_path,
        size_bytes,
    })
}

/// Local artifact name: `{prefix}_{stem}_{job}.{ext}`.
///
/// The stem comes from the hint when there is one, else from the remote
/// filename; the extension always follows the remote filename. Without a
/// job id a random one keeps concurrent downloads apart.
pub fn artifact_file_name(
    prefix: &str,
    name_hint: Option<&str>,
    remote_filename: &str,
    job_id: Option<&str>,
) -> String {
    let remote = Path::new(remote_filename);
    let stem = name_hint
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .and_then(|h| Path::new(h).file_stem())
        .or_else(|| remote.file_stem())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    let ext = remote
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| "mp4".to_string());
    let job = job_id
        .map(str::trim)
        .filter(|j| !j.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());

    sanitize(&format!("{}_{}_{}.{}", prefix, stem, job, ext))
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_name_from_hint() {
        assert_eq!(
            artifact_file_name("colab", Some("My Clip.mov"), "processed.mp4", Some("ab12")),
            "colab_My_Clip_ab12.mp4"
        );
    }

    #[test]
    fn test_artifact_name_from_remote() {
        assert_eq!(
            artifact_file_name("colab", None, "out.webm", Some("j1")),
            "colab_out_j1.webm"
        );
        assert_eq!(
            artifact_file_name("colab", Some("  "), "noext", Some("j1")),
            "colab_noext_j1.mp4"
        );
    }

    #[test]
    fn test_artifact_name_without_job_is_unique() {
        let a = artifact_file_name("colab", None, "x.mp4", None);
        let b = artifact_file_name("colab", None, "x.mp4", None);
        assert_ne!(a, b);
        assert!(a.starts_with("colab_x_"));
    }

    #[test]
    fn test_artifact_name_strips_path_segments() {
        let name = artifact_file_name("colab", Some("../../etc/passwd"), "x.mp4", Some("../j"));
        assert!(!name.contains('/'));
    }
}
