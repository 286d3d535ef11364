//! Remote Metadata Providers
//!
//! A provider answers two questions about a track: its lyric text and the
//! URL of its album cover. Both are best effort; `Ok(None)` means the
//! provider had nothing, `Err` means it could not be asked.

use crate::error::Result;
use async_trait::async_trait;

pub mod netease;

pub use netease::NeteaseProvider;

/// Descriptive tags used to look a track up remotely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackQuery {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
}

impl TrackQuery {
    pub fn new(
        title: Option<String>,
        artist: Option<String>,
        album: Option<String>,
    ) -> Self {
        Self {
            title,
            artist,
            album,
        }
    }

    /// Space-joined search keywords, `None` when every tag is absent.
    pub fn keywords(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.title, &self.artist, &self.album]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect();

        (!parts.is_empty()).then(|| parts.join(" "))
    }
}

#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &'static str;

    async fn lyric(&self, query: &TrackQuery) -> Result<Option<String>>;

    async fn album_art_url(&self, query: &TrackQuery) -> Result<Option<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_skip_blank_tags() {
        let query = TrackQuery::new(Some("Song".into()), None, Some("  ".into()));
        assert_eq!(query.keywords().as_deref(), Some("Song"));

        let full = TrackQuery::new(
            Some("Song".into()),
            Some("Artist".into()),
            Some("Album".into()),
        );
        assert_eq!(full.keywords().as_deref(), Some("Song Artist Album"));

        assert_eq!(TrackQuery::default().keywords(), None);
    }
}
