use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};

/// Content store addressed by logical relative paths such as
/// `qr/guests/<identifier>.svg`. The rest of the system treats the paths
/// as opaque references.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<()>;
    async fn get(&self, path: &str) -> Result<Vec<u8>>;
    /// Returns whether a file was actually removed. Missing files are not
    /// an error.
    async fn delete(&self, path: &str) -> Result<bool>;
}

/// Filesystem-backed store rooted at a configured directory, which is
/// also what the `/storage` route serves.
pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let traversal = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if traversal || relative.as_os_str().is_empty() {
            return Err(AppError::BadRequest(format!("Invalid storage path: {}", path)));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ContentStore for FsContentStore {
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let full_path = self.resolve(path)?;

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::Internal(format!("Failed to create storage directory: {}", e))
            })?;
        }

        let mut file = fs::File::create(&full_path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create file: {}", e)))?;

        file.write_all(bytes)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to write file: {}", e)))?;

        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.resolve(path)?;
        fs::read(&full_path)
            .await
            .map_err(|e| AppError::NotFound(format!("Stored file {}: {}", path, e)))
    }

    async fn delete(&self, path: &str) -> Result<bool> {
        let full_path = self.resolve(path)?;
        match fs::remove_file(&full_path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(AppError::Internal(format!("Failed to delete file: {}", e))),
        }
    }
}
