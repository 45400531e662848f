//! Bootcamp photo storage on the local filesystem.

use std::path::{Path, PathBuf};

use thiserror::Error;

use devcamper_core::ResourceId;

use crate::config::UploadConfig;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Please upload a file")]
    Missing,

    #[error("Please upload an image file")]
    NotAnImage,

    #[error("Please upload an image less than {max} bytes")]
    TooLarge { max: usize },

    #[error("Problem with file upload: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct PhotoStorage {
    dir: PathBuf,
    max_bytes: usize,
}

impl PhotoStorage {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            dir: config.dir.clone(),
            max_bytes: config.max_bytes,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reject non-images and oversized files before anything touches disk.
    pub fn validate(&self, content_type: Option<&str>, size: usize) -> Result<(), UploadError> {
        if size == 0 {
            return Err(UploadError::Missing);
        }
        if !content_type.is_some_and(|ct| ct.starts_with("image/")) {
            return Err(UploadError::NotAnImage);
        }
        if size > self.max_bytes {
            return Err(UploadError::TooLarge { max: self.max_bytes });
        }
        Ok(())
    }

    /// `photo-<id><ext>`, keeping the uploaded file's extension.
    pub fn file_name(id: ResourceId, original: Option<&str>) -> String {
        let ext = original
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
            .unwrap_or_default();
        format!("photo-{id}{ext}")
    }

    /// Validate and write the upload beside its final name. Nothing under
    /// the final name changes until [`PhotoStorage::commit`].
    pub async fn stage(
        &self,
        id: ResourceId,
        original: Option<&str>,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<StagedPhoto, UploadError> {
        self.validate(content_type, bytes.len())?;
        let name = Self::file_name(id, original);
        let partial = self.dir.join(format!(".{name}.{}.part", ResourceId::new()));
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&partial, bytes).await?;
        Ok(StagedPhoto { name, partial })
    }

    /// Move a staged upload over its final name; returns that name.
    pub async fn commit(&self, staged: StagedPhoto) -> Result<String, UploadError> {
        tokio::fs::rename(&staged.partial, self.dir.join(&staged.name)).await?;
        tracing::info!(file = %staged.name, "photo stored");
        Ok(staged.name)
    }

    /// Drop a staged upload that will not be committed.
    pub async fn discard(&self, staged: StagedPhoto) {
        if let Err(e) = tokio::fs::remove_file(&staged.partial).await {
            tracing::warn!(error = %e, file = %staged.partial.display(), "failed to remove staged photo");
        }
    }

    pub async fn remove(&self, name: &str) -> Result<(), UploadError> {
        tokio::fs::remove_file(self.dir.join(name)).await?;
        Ok(())
    }
}

/// A validated upload written to a temporary file.
#[derive(Debug)]
pub struct StagedPhoto {
    name: String,
    partial: PathBuf,
}

impl StagedPhoto {
    /// The name the photo will have once committed.
    pub fn name(&self) -> &str {
        &self.name
    }
}
