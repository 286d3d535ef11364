//! # Lyric Resolution
//!
//! Resolves the lyric of a track in this order, first success wins:
//!
//! 1. The `.lrc` sidecar next to the track (same stem).
//! 2. The remote provider, bounded by the configured timeout. A remote hit is
//!    written back to the sidecar so the next lookup stays local.
//!
//! Failures never propagate: the outcome is either
//! [`LyricOutcome::Text`] or [`LyricOutcome::Unavailable`] with a reason.
//!
//! Remote fetches for the same sidecar are serialized. A caller that waited
//! for another fetch re-reads the sidecar before going remote.

use crate::error::{MetadataError, Result};
use crate::providers::{MetadataProvider, TrackQuery};
use bridge_traits::FileSystemAccess;
use bytes::Bytes;
use core_library::{KeyedLocks, LyricOutcome};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

pub struct LyricResolver {
    fs: Arc<dyn FileSystemAccess>,
    provider: Option<Arc<dyn MetadataProvider>>,
    timeout: Duration,
    fetches: KeyedLocks,
}

impl LyricResolver {
    /// `provider: None` keeps resolution local.
    pub fn new(
        fs: Arc<dyn FileSystemAccess>,
        provider: Option<Arc<dyn MetadataProvider>>,
        timeout: Duration,
    ) -> Self {
        Self {
            fs,
            provider,
            timeout,
            fetches: KeyedLocks::new(),
        }
    }

    /// `song.flac` -> `song.lrc`, in the same directory.
    pub fn sidecar_path(track: &Path) -> PathBuf {
        track.with_extension("lrc")
    }

    /// Read the sidecar of `track`.
    ///
    /// Returns `Ok(None)` when the sidecar exists but holds only whitespace.
    pub async fn read_sidecar(&self, track: &Path) -> Result<Option<String>> {
        let data = self.fs.read_file(&Self::sidecar_path(track)).await?;
        let text = String::from_utf8_lossy(&data);

        Ok((!text.trim().is_empty()).then(|| text.into_owned()))
    }

    #[instrument(skip_all, fields(file = %track.display()))]
    pub async fn resolve(&self, track: &Path, query: &TrackQuery) -> LyricOutcome {
        if let Some(text) = self.local(track).await {
            return LyricOutcome::Text(text);
        }

        let provider = match &self.provider {
            Some(provider) => provider,
            None => return LyricOutcome::Unavailable("remote lyrics are disabled".to_string()),
        };

        let sidecar = Self::sidecar_path(track);
        let _guard = self.fetches.lock(&sidecar.to_string_lossy()).await;

        // Another caller may have written the sidecar while we waited.
        if let Some(text) = self.local(track).await {
            return LyricOutcome::Text(text);
        }

        let text = match self.fetch(provider.as_ref(), query).await {
            Ok(Some(text)) => text,
            Ok(None) => {
                debug!(provider = provider.name(), "No remote lyric");
                return LyricOutcome::Unavailable("no lyric found".to_string());
            }
            Err(e) => {
                warn!(provider = provider.name(), error = %e, "Lyric lookup failed");
                return LyricOutcome::Unavailable(e.to_string());
            }
        };

        match self
            .fs
            .write_file_atomic(&sidecar, Bytes::from(text.clone()))
            .await
        {
            Ok(()) => info!(sidecar = %sidecar.display(), "Saved remote lyric"),
            Err(e) => warn!(sidecar = %sidecar.display(), error = %e, "Failed to save lyric"),
        }

        LyricOutcome::Text(text)
    }

    async fn local(&self, track: &Path) -> Option<String> {
        match self.read_sidecar(track).await {
            Ok(text) => text,
            Err(e) => {
                debug!(error = %e, "No local lyric");
                None
            }
        }
    }

    async fn fetch(
        &self,
        provider: &dyn MetadataProvider,
        query: &TrackQuery,
    ) -> Result<Option<String>> {
        tokio::time::timeout(self.timeout, provider.lyric(query))
            .await
            .map_err(|_| MetadataError::ProviderTimeout(self.timeout))?
    }
}
