//! Recursive directory enumeration.
//!
//! The walk follows symbolic links by default; `walkdir` tracks the ancestor
//! chain so a link pointing back up the tree is reported once instead of being
//! descended into forever. Failures are collected per entry so one unreadable
//! subtree never hides its siblings.

use async_trait::async_trait;
use core_runtime::config::CoreConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, instrument};
use walkdir::WalkDir;

/// A path that could not be read during a scan.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to scan {}: {message}", .path.display())]
pub struct ScanError {
    pub path: PathBuf,
    pub message: String,
}

impl ScanError {
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Files found under a root plus everything that could not be read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Absolute file paths, sorted by name within each directory
    pub files: Vec<PathBuf>,
    pub errors: Vec<ScanError>,
}

impl ScanOutcome {
    fn failed(root: &Path, message: impl Into<String>) -> Self {
        Self {
            files: Vec::new(),
            errors: vec![ScanError::new(root, message)],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    pub max_depth: usize,
    pub follow_symlinks: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_depth: 64,
            follow_symlinks: true,
        }
    }
}

impl From<&CoreConfig> for ScanOptions {
    fn from(config: &CoreConfig) -> Self {
        Self {
            max_depth: config.scan_max_depth,
            follow_symlinks: config.follow_symlinks,
        }
    }
}

/// Enumerates candidate files under a library root.
///
/// Never fails: a missing root yields no files and one error.
#[async_trait]
pub trait FileScanner: Send + Sync {
    async fn scan(&self, root: &Path) -> ScanOutcome;
}

/// `walkdir`-backed scanner that runs on the blocking thread pool.
#[derive(Debug, Clone, Default)]
pub struct DirectoryScanner {
    options: ScanOptions,
}

impl DirectoryScanner {
    pub fn new(options: ScanOptions) -> Self {
        Self { options }
    }

    /// Walk `root` on the current thread.
    pub fn scan_blocking(&self, root: &Path) -> ScanOutcome {
        let root = match std::path::absolute(root) {
            Ok(root) => root,
            Err(e) => return ScanOutcome::failed(root, e.to_string()),
        };

        let walker = WalkDir::new(&root)
            .follow_links(self.options.follow_symlinks)
            .max_depth(self.options.max_depth)
            .sort_by_file_name();

        let mut outcome = ScanOutcome::default();
        for item in walker {
            match item {
                Ok(entry) if entry.file_type().is_file() => {
                    outcome.files.push(entry.into_path());
                }
                Ok(_) => {}
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
                    let message = match e.loop_ancestor() {
                        Some(ancestor) => {
                            format!("symlink loop back to {}", ancestor.display())
                        }
                        None => e.to_string(),
                    };
                    outcome.errors.push(ScanError::new(path, message));
                }
            }
        }

        outcome
    }
}

#[async_trait]
impl FileScanner for DirectoryScanner {
    #[instrument(skip_all, fields(root = %root.display()))]
    async fn scan(&self, root: &Path) -> ScanOutcome {
        let scanner = self.clone();
        let owned_root = root.to_path_buf();

        let outcome = tokio::task::spawn_blocking(move || scanner.scan_blocking(&owned_root))
            .await
            .unwrap_or_else(|e| ScanOutcome::failed(root, format!("scan task failed: {}", e)));

        debug!(
            files = outcome.files.len(),
            errors = outcome.errors.len(),
            "Scan finished"
        );
        outcome
    }
}
