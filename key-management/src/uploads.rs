//! Venue image storage.
//!
//! Images live under one directory as `{uuid}-{sanitised original name}`.
//! The stored path is what ends up in `Venue::images`.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use uuid::Uuid;

/// Longest kept part of a client-supplied file name.
const MAX_NAME_CHARS: usize = 100;

/// File storage failures.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Filesystem error.
    #[error("file storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The path is outside the storage directory.
    #[error("path outside upload directory: {0}")]
    OutsideRoot(String),
}

/// Where venue images go.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Store `bytes`, returning the stored path.
    ///
    /// # Errors
    ///
    /// [`UploadError::Io`] when the file cannot be written.
    async fn save(&self, original_name: &str, bytes: &[u8]) -> Result<String, UploadError>;

    /// Remove a stored file. Removing a missing file succeeds.
    ///
    /// # Errors
    ///
    /// [`UploadError::OutsideRoot`] for foreign paths, [`UploadError::Io`]
    /// when deletion fails.
    async fn remove(&self, path: &str) -> Result<(), UploadError>;
}

/// Whether a multipart part's content type is an image.
#[must_use]
pub fn is_image(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.trim().to_ascii_lowercase().starts_with("image/"))
}

/// Reduce a client file name to a safe final path component.
fn sanitize(original_name: &str) -> String {
    let base = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_NAME_CHARS)
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Images on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    /// Use `root`, creating it if needed.
    ///
    /// # Errors
    ///
    /// [`UploadError::Io`] when the directory cannot be created.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self, UploadError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Storage directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn owned_path(&self, path: &str) -> Result<PathBuf, UploadError> {
        let candidate = PathBuf::from(path);
        let escapes = candidate
            .components()
            .any(|c| matches!(c, Component::ParentDir));

        if escapes || !candidate.starts_with(&self.root) {
            return Err(UploadError::OutsideRoot(path.to_string()));
        }
        Ok(candidate)
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn save(&self, original_name: &str, bytes: &[u8]) -> Result<String, UploadError> {
        let name = format!("{}-{}", Uuid::new_v4().simple(), sanitize(original_name));
        let path = self.root.join(&name);

        // Write under a temporary name so readers never see a partial file
        let temp_path = self.root.join(format!(".{name}.tmp"));
        fs::write(&temp_path, bytes).await?;
        fs::rename(&temp_path, &path).await?;

        tracing::debug!(path = %path.display(), size = bytes.len(), "Stored venue image");
        Ok(path.display().to_string())
    }

    async fn remove(&self, path: &str) -> Result<(), UploadError> {
        let path = self.owned_path(path)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Removed venue image");
                Ok(())
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
