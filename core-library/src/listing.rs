//! Library listing orchestration
//!
//! `list` walks three states: a non-empty full tier wins, then a non-empty
//! short tier, and only when both are empty is the root rescanned. A fresh
//! scan is persisted to the short tier before it is returned; a failed write
//! is logged and does not affect the result.
//!
//! Rescans of the same root are serialized. A caller that waited for another
//! caller's rescan re-reads the short tier and returns that instead of
//! scanning again.

use crate::cache::LibraryCacheStore;
use crate::digest::root_digest;
use crate::error::{LibraryError, Result};
use crate::filter::AudioFilter;
use crate::models::LibraryListing;
use crate::scanner::{DirectoryScanner, FileScanner, ScanOptions};
use crate::single_flight::KeyedLocks;
use core_runtime::config::CoreConfig;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub struct LibraryListingService {
    cache: LibraryCacheStore,
    scanner: Arc<dyn FileScanner>,
    filter: AudioFilter,
    rescans: KeyedLocks,
}

impl LibraryListingService {
    pub fn new(cache: LibraryCacheStore, scanner: Arc<dyn FileScanner>, filter: AudioFilter) -> Self {
        Self {
            cache,
            scanner,
            filter,
            rescans: KeyedLocks::new(),
        }
    }

    /// Service wired with the `walkdir` scanner and the configured extensions.
    pub fn from_config(config: &CoreConfig) -> Self {
        Self::new(
            LibraryCacheStore::from_config(config),
            Arc::new(DirectoryScanner::new(ScanOptions::from(config))),
            AudioFilter::new(&config.audio_extensions),
        )
    }

    pub fn cache(&self) -> &LibraryCacheStore {
        &self.cache
    }

    /// List the audio files under `root`.
    ///
    /// # Errors
    ///
    /// [`LibraryError::EmptyLibrary`] when no tier is populated and a fresh
    /// scan finds no audio files. Nothing is persisted in that case.
    #[instrument(skip_all, fields(root = %root.display()))]
    pub async fn list(&self, root: &Path) -> Result<LibraryListing> {
        let full = self.cache.read_full(root).await;
        if !full.is_empty() {
            debug!(tier = "full", count = full.len(), "Serving cached listing");
            return Ok(LibraryListing::Full(full));
        }

        let short = self.cache.read_short(root).await;
        if !short.is_empty() {
            debug!(tier = "short", count = short.len(), "Serving cached listing");
            return Ok(LibraryListing::Short(short));
        }

        let _guard = self.rescans.lock(&root_digest(root)).await;

        // Another caller may have finished a rescan while we waited.
        let short = self.cache.read_short(root).await;
        if !short.is_empty() {
            debug!(tier = "short", "Rescan completed by concurrent request");
            return Ok(LibraryListing::Short(short));
        }

        let outcome = self.scanner.scan(root).await;
        for error in &outcome.errors {
            warn!(path = %error.path.display(), error = %error.message, "Skipped unreadable path");
        }

        let entries = self.filter.filter(outcome.files);
        if entries.is_empty() {
            info!("No audio files found");
            return Err(LibraryError::EmptyLibrary(root.display().to_string()));
        }

        if let Err(e) = self.cache.write(root, &entries).await {
            warn!(error = %e, "Failed to persist listing");
        }

        info!(count = entries.len(), "Library rescanned");
        Ok(LibraryListing::Short(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LibraryEntry, TrackMetadata};
    use crate::scanner::ScanOutcome;
    use async_trait::async_trait;
    use bridge_desktop::TokioFileSystem;
    use mockall::mock;
    use std::path::PathBuf;

    mock! {
        pub Scanner {}

        #[async_trait]
        impl FileScanner for Scanner {
            async fn scan(&self, root: &Path) -> ScanOutcome;
        }
    }

    fn service_with(cache_dir: &Path, scanner: MockScanner) -> LibraryListingService {
        LibraryListingService::new(
            LibraryCacheStore::new(Arc::new(TokioFileSystem::new()), cache_dir),
            Arc::new(scanner),
            AudioFilter::default(),
        )
    }

    fn outcome(files: &[&str]) -> ScanOutcome {
        ScanOutcome {
            files: files.iter().map(PathBuf::from).collect(),
            errors: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_rescan_persists_and_second_call_hits_cache() {
        let temp = tempfile::tempdir().unwrap();
        let mut scanner = MockScanner::new();
        scanner
            .expect_scan()
            .times(1)
            .returning(|_| outcome(&["/music/a.mp3", "/music/b.txt", "/music/c.flac"]));
        let service = service_with(temp.path(), scanner);
        let root = Path::new("/music");

        let first = service.list(root).await.unwrap();
        let second = service.list(root).await.unwrap();

        let expected = LibraryListing::Short(vec![
            LibraryEntry::new("/music/a.mp3"),
            LibraryEntry::new("/music/c.flac"),
        ]);
        assert_eq!(first, expected);
        assert_eq!(second, expected);
    }

    #[tokio::test]
    async fn test_full_tier_takes_precedence() {
        let temp = tempfile::tempdir().unwrap();
        let mut scanner = MockScanner::new();
        scanner.expect_scan().never();
        let service = service_with(temp.path(), scanner);
        let root = Path::new("/music");

        let records = vec![TrackMetadata::unresolved("/music/a.mp3")];
        service.cache().write_full(root, &records).await.unwrap();
        service
            .cache()
            .write(root, &[LibraryEntry::new("/music/other.mp3")])
            .await
            .unwrap();

        assert_eq!(service.list(root).await.unwrap(), LibraryListing::Full(records));
    }

    #[tokio::test]
    async fn test_no_audio_files_is_an_error_and_not_persisted() {
        let temp = tempfile::tempdir().unwrap();
        let mut scanner = MockScanner::new();
        scanner
            .expect_scan()
            .times(2)
            .returning(|_| outcome(&["/docs/readme.txt"]));
        let service = service_with(temp.path(), scanner);
        let root = Path::new("/docs");

        let err = service.list(root).await.unwrap_err();
        assert_eq!(err.to_string(), "target path is empty: /docs");

        // Nothing cached, so the next call scans again.
        assert!(service.list(root).await.is_err());
    }

    #[tokio::test]
    async fn test_concurrent_rescans_collapse() {
        let temp = tempfile::tempdir().unwrap();
        let mut scanner = MockScanner::new();
        scanner
            .expect_scan()
            .times(1)
            .returning(|_| outcome(&["/music/a.mp3"]));
        let service = Arc::new(service_with(temp.path(), scanner));
        let root = Path::new("/music");

        let (a, b) = tokio::join!(service.list(root), service.list(root));

        assert_eq!(a.unwrap(), b.unwrap());
    }
}
