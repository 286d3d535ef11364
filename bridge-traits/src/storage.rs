//! Storage and File System Abstractions
//!
//! Provides a platform-agnostic trait for the file I/O the media library core
//! performs: cache artifacts, lyric sidecars and the shared album art cache.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// File system access trait
///
/// Abstracts file I/O operations so the cache store and the resolvers can be
/// driven by the desktop implementation or by an in-memory fake in tests.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::FileSystemAccess;
///
/// async fn persist(fs: &dyn FileSystemAccess, dir: &Path, data: Bytes) -> Result<()> {
///     fs.create_dir_all(dir).await?;
///     fs.write_file_atomic(&dir.join("library.json"), data).await
/// }
/// ```
#[async_trait]
pub trait FileSystemAccess: Send + Sync {
    /// Check if a file or directory exists
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Create a directory and all parent directories if they don't exist
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Read entire file contents into memory
    async fn read_file(&self, path: &Path) -> Result<Bytes>;

    /// Write data to a file, creating it if it doesn't exist
    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()>;

    /// Rename a file, replacing the destination if it exists
    async fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Delete a file
    async fn delete_file(&self, path: &Path) -> Result<()>;

    /// Write data so that readers observe either the old or the new content.
    ///
    /// The data lands in a uniquely named sibling temp file first and is then
    /// renamed over `path`. On failure the temp file is removed.
    async fn write_file_atomic(&self, path: &Path, data: Bytes) -> Result<()> {
        let temp = temp_sibling(path);
        if let Err(e) = self.write_file(&temp, data).await {
            let _ = self.delete_file(&temp).await;
            return Err(e);
        }
        if let Err(e) = self.rename(&temp, path).await {
            let _ = self.delete_file(&temp).await;
            return Err(e);
        }
        Ok(())
    }
}

/// Temp file path next to `path`, unique per call.
pub fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4().simple()))
}
