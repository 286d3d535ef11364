//! On-disk listing cache
//!
//! Each library root owns two JSON artifacts under the library cache
//! directory, named after the root's digest:
//!
//! - `<digest>.json` (short tier): `LibraryEntry[]`
//! - `<digest>-full.json` (full tier): `TrackMetadata[]`
//!
//! Artifacts are never invalidated; a stale listing is preferred over a repeat
//! walk. Reads come in two flavours: `load_*` returns the explicit
//! [`CacheError`], `read_*` treats every error as a miss.

use crate::digest::root_digest;
use crate::models::{LibraryEntry, TrackMetadata};
use bridge_traits::{BridgeError, FileSystemAccess};
use bytes::Bytes;
use core_runtime::config::CoreConfig;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
    Short,
    Full,
}

impl CacheTier {
    pub fn suffix(&self) -> &'static str {
        match self {
            CacheTier::Short => "",
            CacheTier::Full => "-full",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheTier::Short => "short",
            CacheTier::Full => "full",
        }
    }
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache artifact missing: {}", .path.display())]
    Missing { path: PathBuf },

    #[error("cache artifact unreadable: {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: BridgeError,
    },

    #[error("cache artifact corrupt: {}: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cache write failed: {}: {message}", .path.display())]
    Write { path: PathBuf, message: String },
}

/// Reads and writes the listing cache tiers.
#[derive(Clone)]
pub struct LibraryCacheStore {
    fs: Arc<dyn FileSystemAccess>,
    dir: PathBuf,
}

impl LibraryCacheStore {
    pub fn new(fs: Arc<dyn FileSystemAccess>, dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            dir: dir.into(),
        }
    }

    pub fn from_config(config: &CoreConfig) -> Self {
        Self::new(config.file_system.clone(), config.library_cache_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the artifact for `root` in `tier`. Pure.
    pub fn artifact_path(&self, root: &Path, tier: CacheTier) -> PathBuf {
        self.dir
            .join(format!("{}{}.json", root_digest(root), tier.suffix()))
    }

    pub async fn load_short(&self, root: &Path) -> Result<Vec<LibraryEntry>, CacheError> {
        self.load(root, CacheTier::Short).await
    }

    pub async fn load_full(&self, root: &Path) -> Result<Vec<TrackMetadata>, CacheError> {
        self.load(root, CacheTier::Full).await
    }

    /// Short tier, or empty on any error.
    pub async fn read_short(&self, root: &Path) -> Vec<LibraryEntry> {
        Self::or_miss(self.load_short(root).await, CacheTier::Short)
    }

    /// Full tier, or empty on any error.
    pub async fn read_full(&self, root: &Path) -> Vec<TrackMetadata> {
        Self::or_miss(self.load_full(root).await, CacheTier::Full)
    }

    /// Persist the short tier.
    pub async fn write(&self, root: &Path, entries: &[LibraryEntry]) -> Result<(), CacheError> {
        self.store(root, CacheTier::Short, entries).await
    }

    /// Persist the full tier.
    pub async fn write_full(
        &self,
        root: &Path,
        records: &[TrackMetadata],
    ) -> Result<(), CacheError> {
        self.store(root, CacheTier::Full, records).await
    }

    #[instrument(skip_all, fields(root = %root.display(), tier = tier.as_str()))]
    async fn load<T: DeserializeOwned>(
        &self,
        root: &Path,
        tier: CacheTier,
    ) -> Result<Vec<T>, CacheError> {
        let path = self.artifact_path(root, tier);
        let data = self.fs.read_file(&path).await.map_err(|source| {
            if source.is_not_found() {
                CacheError::Missing { path: path.clone() }
            } else {
                CacheError::Unreadable {
                    path: path.clone(),
                    source,
                }
            }
        })?;

        serde_json::from_slice(&data).map_err(|source| CacheError::Corrupt { path, source })
    }

    #[instrument(skip_all, fields(root = %root.display(), tier = tier.as_str(), count = payload.len()))]
    async fn store<T: Serialize + Sync>(
        &self,
        root: &Path,
        tier: CacheTier,
        payload: &[T],
    ) -> Result<(), CacheError> {
        let path = self.artifact_path(root, tier);
        let write_error = |message: String| CacheError::Write {
            path: path.clone(),
            message,
        };

        let json = serde_json::to_vec_pretty(payload).map_err(|e| write_error(e.to_string()))?;

        self.fs
            .create_dir_all(&self.dir)
            .await
            .map_err(|e| write_error(e.to_string()))?;
        self.fs
            .write_file_atomic(&path, Bytes::from(json))
            .await
            .map_err(|e| write_error(e.to_string()))?;

        debug!(path = %path.display(), "Cache artifact written");
        Ok(())
    }

    fn or_miss<T>(result: Result<Vec<T>, CacheError>, tier: CacheTier) -> Vec<T> {
        result.unwrap_or_else(|e| {
            debug!(tier = tier.as_str(), error = %e, "Cache miss");
            Vec::new()
        })
    }
}
