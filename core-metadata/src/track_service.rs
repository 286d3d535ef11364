//! Per-track metadata composition
//!
//! Embedded tags are always read. Lyric and cover resolution only run when
//! their field is requested, and run concurrently. Unrequested fields are
//! `null` in the result.

use crate::artwork::{CoverArtResolver, RemoteArtwork};
use crate::extractor::{EmbeddedMetadata, MetadataReader};
use crate::lyrics::LyricResolver;
use crate::providers::{MetadataProvider, NeteaseProvider, TrackQuery};
use core_library::{FieldSet, MetadataField, TrackMetadata};
use core_runtime::config::CoreConfig;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, instrument};

pub struct TrackMetadataService {
    reader: MetadataReader,
    lyrics: LyricResolver,
    artwork: CoverArtResolver,
}

impl TrackMetadataService {
    pub fn new(reader: MetadataReader, lyrics: LyricResolver, artwork: CoverArtResolver) -> Self {
        Self {
            reader,
            lyrics,
            artwork,
        }
    }

    /// Service wired to NetEase through the configured HTTP client.
    ///
    /// Each remote half is only enabled when its feature flag is on.
    pub fn from_config(config: &CoreConfig) -> Self {
        let provider: Option<Arc<dyn MetadataProvider>> = NeteaseProvider::from_config(config)
            .map(|provider| Arc::new(provider) as Arc<dyn MetadataProvider>);

        let lyric_provider = provider
            .clone()
            .filter(|_| config.features.enable_lyrics);

        let remote_artwork = match (&provider, &config.http_client) {
            (Some(provider), Some(http_client)) if config.features.enable_artwork_remote => {
                Some(RemoteArtwork {
                    provider: provider.clone(),
                    http_client: http_client.clone(),
                })
            }
            _ => None,
        };

        Self::new(
            MetadataReader::new(),
            LyricResolver::new(
                config.file_system.clone(),
                lyric_provider,
                config.remote_timeout,
            ),
            CoverArtResolver::new(
                config.file_system.clone(),
                config.art_cache_dir(),
                remote_artwork,
                config.remote_timeout,
            ),
        )
    }

    /// Best-effort metadata for `path`, limited to `fields`. Never fails.
    #[instrument(skip_all, fields(file = %path.display()))]
    pub async fn get_metadata(&self, path: &Path, fields: &FieldSet) -> TrackMetadata {
        let embedded = self.reader.read(path).await;
        let title = embedded.title.clone().or_else(|| fallback_title(path));
        let query = TrackQuery::new(
            title.clone(),
            embedded.artist.clone(),
            embedded.album.clone(),
        );

        let lyric = async {
            if fields.contains(MetadataField::Lyric) {
                Some(self.lyrics.resolve(path, &query).await)
            } else {
                None
            }
        };
        let picture = async {
            if fields.contains(MetadataField::Picture) {
                self.artwork.resolve(&query, embedded.picture.as_ref()).await
            } else {
                None
            }
        };
        let (lyric, picture) = tokio::join!(lyric, picture);

        let EmbeddedMetadata {
            artist,
            artists,
            album,
            genre,
            date,
            duration,
            ..
        } = embedded;

        let record = TrackMetadata {
            src: path.to_path_buf(),
            title,
            artist,
            artists,
            album,
            genre,
            date,
            duration,
            picture,
            lyric,
        };
        debug!(
            lyric = record.lyric.is_some(),
            picture = record.picture.is_some(),
            "Metadata resolved"
        );

        record.retain(fields)
    }
}

/// File name without its extension.
fn fallback_title(path: &Path) -> Option<String> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
}
