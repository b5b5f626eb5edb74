use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use report_logging::{report_info, report_warn};
use url::Url;

use crate::filename::artifact_filename;
use crate::persist::{AtomicFileWriter, PersistError};
use crate::transport::{ensure_success, map_reqwest_error};
use crate::{FailureKind, HttpTransport, TransportError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedArtifact {
    pub href: String,
    pub path: PathBuf,
    pub bytes: u64,
}

/// Downloads result artifacts. Links are resolved against the service base
/// url, so server-relative paths like `/download/sr/x.dcm` work as-is.
#[derive(Debug, Clone)]
pub struct ArtifactFetcher {
    client: reqwest::Client,
    base_url: Url,
    max_bytes: u64,
}

impl ArtifactFetcher {
    pub fn new(transport: &HttpTransport, max_bytes: u64) -> Self {
        Self {
            client: transport.client().clone(),
            base_url: transport.base_url().clone(),
            max_bytes,
        }
    }

    pub fn resolve(&self, href: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(href)
            .map_err(|err| TransportError::new(FailureKind::InvalidUrl, format!("{href}: {err}")))
    }

    pub async fn fetch(&self, href: &str) -> Result<Vec<u8>, TransportError> {
        let url = self.resolve(href)?;
        let response = self.client.get(url).send().await.map_err(map_reqwest_error)?;
        let response = ensure_success(response, None).await?;

        if let Some(content_len) = response.content_length() {
            if content_len > self.max_bytes {
                return Err(self.too_large(Some(content_len)));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.max_bytes {
                return Err(self.too_large(Some(next_len)));
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }

    pub async fn save(
        &self,
        href: &str,
        writer: &AtomicFileWriter,
    ) -> Result<SavedArtifact, TransportError> {
        let bytes = self.fetch(href).await?;
        let path = writer
            .write(&artifact_filename(href), &bytes)
            .map_err(persist_error)?;
        report_info!("Saved artifact {} to {}", href, path.display());
        Ok(SavedArtifact {
            href: href.to_string(),
            path,
            bytes: bytes.len() as u64,
        })
    }

    /// Saves every link in order; stops at the first failure.
    pub async fn save_all(
        &self,
        hrefs: &[String],
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, TransportError> {
        let writer = AtomicFileWriter::new(output_dir.to_path_buf());
        let mut saved = Vec::with_capacity(hrefs.len());
        for href in hrefs {
            match self.save(href, &writer).await {
                Ok(artifact) => saved.push(artifact.path),
                Err(err) => {
                    report_warn!("Artifact {} failed: {}", href, err);
                    return Err(err);
                }
            }
        }
        Ok(saved)
    }

    fn too_large(&self, actual: Option<u64>) -> TransportError {
        TransportError::new(
            FailureKind::TooLarge {
                max_bytes: self.max_bytes,
                actual,
            },
            "artifact too large",
        )
    }
}

fn persist_error(err: PersistError) -> TransportError {
    TransportError::new(FailureKind::Io, err.to_string())
}
