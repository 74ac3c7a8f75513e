//! Uploaded image storage.
//!
//! Images are written to a local directory and served back under `/uploads`.
//! Both the file extension and the declared MIME type must name a JPEG or PNG.

use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;

use crate::config::UploadConfig;
use crate::error::AppError;

/// Public path prefix the upload directory is served under
pub const PUBLIC_PREFIX: &str = "/uploads";

const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];
const ALLOWED_MIME_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png"];

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Images only!")]
    NotAnImage,

    #[error("No file uploaded")]
    Missing,

    #[error("File exceeds the maximum size of {0} bytes")]
    TooLarge(usize),

    #[error("Failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Io(e) => AppError::Internal(format!("Failed to store upload: {}", e)),
            other => AppError::Validation(other.to_string()),
        }
    }
}

/// Local directory image store.
pub struct ImageStore {
    dir: PathBuf,
    max_size: usize,
}

impl ImageStore {
    /// Open the store, creating the directory if needed
    pub fn open(config: &UploadConfig) -> std::io::Result<Self> {
        let dir = PathBuf::from(&config.dir);
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            max_size: config.max_size,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Lowercased extension of an accepted image, or `NotAnImage`
    pub fn validate(file_name: &str, content_type: Option<&str>) -> Result<String, UploadError> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .ok_or(UploadError::NotAnImage)?;

        if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(UploadError::NotAnImage);
        }

        let mime = content_type
            .map(|m| m.trim().to_ascii_lowercase())
            .ok_or(UploadError::NotAnImage)?;

        if !ALLOWED_MIME_TYPES.contains(&mime.as_str()) {
            return Err(UploadError::NotAnImage);
        }

        Ok(extension)
    }

    /// Store an image and return its public path (`/uploads/<file>`)
    #[tracing::instrument(name = "uploads.store", skip(self, bytes), fields(size = bytes.len()))]
    pub async fn store(
        &self,
        file_name: &str,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<String, UploadError> {
        let extension = Self::validate(file_name, content_type)?;

        if bytes.is_empty() {
            return Err(UploadError::Missing);
        }
        if bytes.len() > self.max_size {
            return Err(UploadError::TooLarge(self.max_size));
        }

        let stored_name = format!(
            "image-{}-{}.{}",
            Utc::now().timestamp_millis(),
            uuid::Uuid::new_v4().simple(),
            extension
        );
        tokio::fs::write(self.dir.join(&stored_name), bytes).await?;

        tracing::debug!(file = %stored_name, "Stored uploaded image");
        Ok(format!("{}/{}", PUBLIC_PREFIX, stored_name))
    }
}
