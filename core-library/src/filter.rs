//! Audio file classification by extension.

use crate::models::LibraryEntry;
use core_runtime::config::DEFAULT_AUDIO_EXTENSIONS;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Keeps paths whose extension is in a recognized set.
///
/// Matching is case-insensitive: `track.FLAC` and `track.flac` are both audio
/// when `flac` is recognized.
#[derive(Debug, Clone)]
pub struct AudioFilter {
    extensions: HashSet<String>,
}

impl AudioFilter {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        Self { extensions }
    }

    pub fn is_audio(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.contains(&ext.to_ascii_lowercase()))
            .unwrap_or(false)
    }

    /// Audio entries from `paths`, in input order.
    pub fn filter<I>(&self, paths: I) -> Vec<LibraryEntry>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        paths
            .into_iter()
            .filter(|path| self.is_audio(path))
            .map(LibraryEntry::new)
            .collect()
    }
}

impl Default for AudioFilter {
    fn default() -> Self {
        Self::new(DEFAULT_AUDIO_EXTENSIONS)
    }
}
