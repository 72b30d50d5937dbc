//! Upload storage: the file collaborator behind `input_ref`.
//!
//! Uploaded bytes are written once under the configured directory with a
//! collision-free name; the returned path is the opaque reference the rest
//! of the pipeline carries. The core never reads the bytes back; only the
//! recognition adapter resolves the reference.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// File extensions accepted as images.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "bmp", "gif", "tiff"];

/// Errors that can occur during upload storage operations.
#[derive(Debug, Error)]
pub enum UploadError {
    /// IO operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not a recognizable image type.
    #[error("Not an image file: {0}")]
    NotAnImage(String),

    /// Storage directory creation failed.
    #[error("Failed to create upload directory: {0}")]
    DirectoryCreationFailed(String),
}

/// A stored upload, ready to be submitted.
#[derive(Debug, Clone)]
pub struct StoredUpload {
    /// Path of the stored file; used as the task's `input_ref`.
    pub path: PathBuf,
    /// The client-supplied filename.
    pub original_filename: String,
}

impl StoredUpload {
    /// Returns the stored path as an `input_ref` string.
    pub fn input_ref(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

/// File-based storage for uploaded images.
pub struct UploadStore {
    base_path: PathBuf,
}

impl UploadStore {
    /// Creates a new upload store rooted at the given directory.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Returns the base storage path.
    pub fn base_path(&self) -> &PathBuf {
        &self.base_path
    }

    /// Ensures the storage directory exists.
    async fn ensure_directory(&self) -> Result<(), UploadError> {
        if !self.base_path.exists() {
            fs::create_dir_all(&self.base_path).await.map_err(|e| {
                UploadError::DirectoryCreationFailed(format!(
                    "Failed to create {:?}: {}",
                    self.base_path, e
                ))
            })?;
        }

        Ok(())
    }

    /// Stores uploaded bytes and returns the reference to hand the producer.
    ///
    /// The stored name is `<uuid><original extension>`, so two uploads of
    /// the same file never collide. Non-image extensions are rejected.
    pub async fn save(
        &self,
        original_filename: &str,
        data: &[u8],
    ) -> Result<StoredUpload, UploadError> {
        let extension = image_extension(original_filename)
            .ok_or_else(|| UploadError::NotAnImage(original_filename.to_string()))?;

        self.ensure_directory().await?;

        let stored_name = format!("{}.{}", Uuid::new_v4(), extension);
        let path = self.base_path.join(stored_name);

        let mut file = fs::File::create(&path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;

        Ok(StoredUpload {
            path,
            original_filename: original_filename.to_string(),
        })
    }

    /// Copies an existing file into the store.
    ///
    /// Convenience for the CLI surface, where the upload arrives as a path
    /// rather than a byte stream.
    pub async fn save_file(&self, source: impl AsRef<Path>) -> Result<StoredUpload, UploadError> {
        let source = source.as_ref();
        let original_filename = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let data = fs::read(source).await?;
        self.save(&original_filename, &data).await
    }
}

/// Returns the lowercase image extension of a filename, if it has one.
fn image_extension(filename: &str) -> Option<String> {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())?
        .to_ascii_lowercase();

    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Some(ext)
    } else {
        None
    }
}
