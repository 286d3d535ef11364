//! NetEase Cloud Music client
//!
//! Uses the public web endpoints:
//!
//! - **Search**: `{base}/api/search/get/web?s={keywords}&type=1&offset=0&limit=1`
//! - **Lyric**: `{base}/api/song/lyric?id={song_id}&lv=1&kv=1&tv=-1`
//! - **Album**: `{base}/api/album/{album_id}` (only when the search hit carries
//!   no picture URL)
//!
//! Only the first search hit is used.

use crate::error::{MetadataError, Result};
use crate::providers::{MetadataProvider, TrackQuery};
use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use core_runtime::config::{CoreConfig, ProviderConfig};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko)";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Option<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    songs: Vec<SongHit>,
}

#[derive(Debug, Clone, Deserialize)]
struct SongHit {
    id: u64,
    #[serde(default)]
    album: Option<AlbumHit>,
}

#[derive(Debug, Clone, Deserialize)]
struct AlbumHit {
    #[serde(default)]
    id: Option<u64>,
    #[serde(rename = "picUrl", default)]
    pic_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AlbumResponse {
    #[serde(default)]
    album: Option<AlbumHit>,
}

#[derive(Debug, Deserialize)]
struct LyricResponse {
    #[serde(default)]
    lrc: Option<LyricBody>,
}

#[derive(Debug, Deserialize)]
struct LyricBody {
    #[serde(default)]
    lyric: Option<String>,
}

pub struct NeteaseProvider {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    timeout: Duration,
}

impl NeteaseProvider {
    pub fn new(http_client: Arc<dyn HttpClient>, provider: &ProviderConfig, timeout: Duration) -> Self {
        Self {
            http_client,
            base_url: provider.base_url.clone(),
            timeout,
        }
    }

    /// Provider over the configured HTTP client, if there is one.
    pub fn from_config(config: &CoreConfig) -> Option<Self> {
        config
            .http_client
            .clone()
            .map(|client| Self::new(client, &config.provider, config.remote_timeout))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T> {
        let request = HttpRequest::new(HttpMethod::Get, url)
            .header("User-Agent", USER_AGENT)
            .header("Referer", format!("{}/", self.base_url))
            .header("Accept", "application/json")
            .timeout(self.timeout);

        let response = self.http_client.execute(request).await?;
        if !response.is_success() {
            return Err(MetadataError::RemoteApi(format!(
                "NetEase returned status {}",
                response.status
            )));
        }

        Ok(response.json()?)
    }

    async fn search(&self, query: &TrackQuery) -> Result<Option<SongHit>> {
        let keywords = match query.keywords() {
            Some(keywords) => keywords,
            None => {
                debug!("Nothing to search for");
                return Ok(None);
            }
        };

        let url = format!(
            "{}/api/search/get/web?s={}&type=1&offset=0&limit=1",
            self.base_url,
            urlencoding::encode(&keywords)
        );
        let response: SearchResponse = self.get_json(url).await?;

        let hit = response.result.and_then(|result| result.songs.into_iter().next());
        debug!(keywords = %keywords, found = hit.is_some(), "NetEase search");
        Ok(hit)
    }
}

#[async_trait]
impl MetadataProvider for NeteaseProvider {
    fn name(&self) -> &'static str {
        "netease"
    }

    #[instrument(skip_all, fields(provider = "netease"))]
    async fn lyric(&self, query: &TrackQuery) -> Result<Option<String>> {
        let song = match self.search(query).await? {
            Some(song) => song,
            None => return Ok(None),
        };

        let url = format!(
            "{}/api/song/lyric?id={}&lv=1&kv=1&tv=-1",
            self.base_url, song.id
        );
        let response: LyricResponse = self.get_json(url).await?;

        Ok(response
            .lrc
            .and_then(|lrc| lrc.lyric)
            .filter(|lyric| !lyric.trim().is_empty()))
    }

    #[instrument(skip_all, fields(provider = "netease"))]
    async fn album_art_url(&self, query: &TrackQuery) -> Result<Option<String>> {
        let album = match self.search(query).await?.and_then(|song| song.album) {
            Some(album) => album,
            None => return Ok(None),
        };

        if let Some(url) = album.pic_url.filter(|url| !url.is_empty()) {
            return Ok(Some(url));
        }

        let album_id = match album.id {
            Some(id) => id,
            None => return Ok(None),
        };
        let response: AlbumResponse = self
            .get_json(format!("{}/api/album/{}", self.base_url, album_id))
            .await?;

        Ok(response
            .album
            .and_then(|album| album.pic_url)
            .filter(|url| !url.is_empty()))
    }
}
