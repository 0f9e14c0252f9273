//! Sequential document upload.

use std::fmt;
use std::path::{Path, PathBuf};

use ragchat_client::{Backend, UploadFile, UploadResponse};
use ragchat_core::config::UploadConfig;
use ragchat_core::RagchatError;

use crate::error::ChatError;

/// Progress of a single file, as reported to the observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadStatus {
    Uploading { file: String },
    Uploaded { filename: String },
    Failed { file: String, detail: String },
}

impl UploadStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, UploadStatus::Failed { .. })
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadStatus::Uploading { .. } => f.write_str("Uploading..."),
            UploadStatus::Uploaded { filename } => write!(f, "Uploaded: {}", filename),
            UploadStatus::Failed { detail, .. } => write!(f, "Error: {}", detail),
        }
    }
}

/// Final state of one file in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub path: PathBuf,
    pub status: UploadStatus,
}

/// Uploads files one at a time, restricted to a set of extensions.
#[derive(Debug, Clone)]
pub struct Uploader {
    accepted_extensions: Vec<String>,
}

impl Default for Uploader {
    fn default() -> Self {
        Self::from_config(&UploadConfig::default())
    }
}

impl Uploader {
    /// Extensions are compared case-insensitively, with or without a dot.
    pub fn new<I, S>(accepted_extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            accepted_extensions: accepted_extensions
                .into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(&config.accepted_extensions)
    }

    pub fn accepted_extensions(&self) -> &[String] {
        &self.accepted_extensions
    }

    pub fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .is_some_and(|e| self.accepted_extensions.iter().any(|a| *a == e))
    }

    /// Read and upload one file.
    pub async fn upload_file<B: Backend + ?Sized>(
        &self,
        backend: &B,
        path: &Path,
    ) -> Result<UploadResponse, ChatError> {
        let name = display_name(path);
        if !self.accepts(path) {
            return Err(ChatError::Upload(format!("unsupported file type: {}", name)));
        }
        let bytes = tokio::fs::read(path).await.map_err(RagchatError::from)?;
        tracing::debug!(file = %name, bytes = bytes.len(), "Uploading file");
        Ok(backend.upload(UploadFile::new(name, bytes)).await?)
    }

    /// Upload `paths` in order. `observer` sees every status change. A
    /// failed file does not stop the batch.
    pub async fn upload_batch<B, F>(
        &self,
        backend: &B,
        paths: &[PathBuf],
        mut observer: F,
    ) -> Vec<UploadOutcome>
    where
        B: Backend + ?Sized,
        F: FnMut(&UploadStatus),
    {
        let mut outcomes = Vec::with_capacity(paths.len());
        for path in paths {
            let file = display_name(path);
            observer(&UploadStatus::Uploading { file: file.clone() });

            let status = match self.upload_file(backend, path).await {
                Ok(resp) => {
                    tracing::info!(file = %file, "Upload complete");
                    UploadStatus::Uploaded {
                        filename: resp.filename,
                    }
                }
                Err(e) => {
                    tracing::warn!(file = %file, error = %e, "Upload failed");
                    UploadStatus::Failed {
                        file,
                        detail: e.detail_text(),
                    }
                }
            };
            observer(&status);
            outcomes.push(UploadOutcome {
                path: path.clone(),
                status,
            });
        }
        outcomes
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
