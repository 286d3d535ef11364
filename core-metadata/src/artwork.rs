//! # Cover Art Resolution
//!
//! Produces a displayable reference to a track's cover:
//!
//! - embedded picture: a `data:` URI of the tag bytes
//! - art cache hit: a `file://` URI under the album cover directory
//! - remote: the provider's URL, with the image downloaded, re-encoded to PNG
//!   and stored in the art cache for next time
//!
//! The art cache is keyed by `md5(artist + album)` and shared by every track
//! of an album, across library roots.

use crate::error::{MetadataError, Result};
use crate::extractor::EmbeddedPicture;
use crate::providers::{MetadataProvider, TrackQuery};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use bridge_traits::FileSystemAccess;
use bytes::Bytes;
use core_library::digest::album_digest;
use core_library::KeyedLocks;
use image::ImageFormat;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Remote half of the resolver: where to ask, and how to download.
pub struct RemoteArtwork {
    pub provider: Arc<dyn MetadataProvider>,
    pub http_client: Arc<dyn HttpClient>,
}

pub struct CoverArtResolver {
    fs: Arc<dyn FileSystemAccess>,
    art_dir: PathBuf,
    remote: Option<RemoteArtwork>,
    timeout: Duration,
    fetches: KeyedLocks,
}

impl CoverArtResolver {
    /// `remote: None` limits resolution to embedded art and the art cache.
    pub fn new(
        fs: Arc<dyn FileSystemAccess>,
        art_dir: impl Into<PathBuf>,
        remote: Option<RemoteArtwork>,
        timeout: Duration,
    ) -> Self {
        Self {
            fs,
            art_dir: art_dir.into(),
            remote,
            timeout,
            fetches: KeyedLocks::new(),
        }
    }

    pub fn art_dir(&self) -> &Path {
        &self.art_dir
    }

    /// Cache file for an album, `None` when both artist and album are unknown.
    pub fn art_path(&self, artist: Option<&str>, album: Option<&str>) -> Option<PathBuf> {
        album_digest(artist, album).map(|digest| self.art_dir.join(format!("{}.png", digest)))
    }

    #[instrument(skip_all, fields(album = ?query.album))]
    pub async fn resolve(
        &self,
        query: &TrackQuery,
        embedded: Option<&EmbeddedPicture>,
    ) -> Option<String> {
        if let Some(picture) = embedded {
            return Some(data_uri(picture));
        }

        let path = self.art_path(query.artist.as_deref(), query.album.as_deref())?;
        if self.is_cached(&path).await {
            return Some(file_uri(&path));
        }

        let remote = self.remote.as_ref()?;
        let _guard = self.fetches.lock(&path.to_string_lossy()).await;

        // Another caller may have populated the cache while we waited.
        if self.is_cached(&path).await {
            return Some(file_uri(&path));
        }

        let url = match self.lookup(remote.provider.as_ref(), query).await {
            Ok(Some(url)) => url,
            Ok(None) => {
                debug!("No remote cover");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "Cover lookup failed");
                return None;
            }
        };

        let data = match self.download(remote.http_client.as_ref(), &url).await {
            Ok(data) => data,
            Err(e) => {
                warn!(url = %url, error = %e, "Cover download failed");
                return None;
            }
        };

        if let Err(e) = self.store(&path, data).await {
            warn!(path = %path.display(), error = %e, "Failed to cache cover");
        }

        Some(url)
    }

    async fn is_cached(&self, path: &Path) -> bool {
        self.fs.exists(path).await.unwrap_or(false)
    }

    async fn lookup(
        &self,
        provider: &dyn MetadataProvider,
        query: &TrackQuery,
    ) -> Result<Option<String>> {
        tokio::time::timeout(self.timeout, provider.album_art_url(query))
            .await
            .map_err(|_| MetadataError::ProviderTimeout(self.timeout))?
    }

    /// Bounded by the remote timeout as a whole, retries included.
    async fn download(&self, http_client: &dyn HttpClient, url: &str) -> Result<Bytes> {
        let request = HttpRequest::new(HttpMethod::Get, url).timeout(self.timeout);
        let response = tokio::time::timeout(self.timeout, http_client.execute(request))
            .await
            .map_err(|_| MetadataError::ProviderTimeout(self.timeout))??;

        if !response.is_success() {
            return Err(MetadataError::ArtworkError(format!(
                "download returned status {}",
                response.status
            )));
        }
        if response.body.is_empty() {
            return Err(MetadataError::ArtworkError("empty download".to_string()));
        }

        Ok(response.body)
    }

    /// Re-encode to PNG and write atomically.
    async fn store(&self, path: &Path, data: Bytes) -> Result<()> {
        let png = tokio::task::spawn_blocking(move || to_png(&data))
            .await
            .map_err(|e| MetadataError::ImageError(format!("encode task failed: {}", e)))??;

        self.fs.create_dir_all(&self.art_dir).await?;
        self.fs.write_file_atomic(path, Bytes::from(png)).await?;

        info!(path = %path.display(), "Cover cached");
        Ok(())
    }
}

fn to_png(data: &[u8]) -> Result<Vec<u8>> {
    let image = image::load_from_memory(data)
        .map_err(|e| MetadataError::ImageError(format!("Failed to load image: {}", e)))?;

    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| MetadataError::ImageError(format!("Failed to encode PNG: {}", e)))?;
    Ok(png)
}

fn data_uri(picture: &EmbeddedPicture) -> String {
    let mime = picture
        .mime_type
        .as_deref()
        .or_else(|| detect_mime_type(&picture.data))
        .unwrap_or("application/octet-stream");

    format!("data:{};base64,{}", mime, STANDARD.encode(&picture.data))
}

fn file_uri(path: &Path) -> String {
    let path = path.to_string_lossy().replace('\\', "/");
    if path.starts_with('/') {
        format!("file://{}", path)
    } else {
        format!("file:///{}", path)
    }
}

/// MIME type from the leading magic bytes.
fn detect_mime_type(data: &[u8]) -> Option<&'static str> {
    match data {
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("image/png"),
        [0x47, 0x49, 0x46, 0x38, ..] => Some("image/gif"),
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),
        [0x42, 0x4D, ..] => Some("image/bmp"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_desktop::TokioFileSystem;
    use bridge_traits::http::HttpResponse;
    use mockall::mock;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    mock! {
        pub Http {}

        #[async_trait]
        impl HttpClient for Http {
            async fn execute(&self, request: HttpRequest) -> bridge_traits::error::Result<HttpResponse>;
        }
    }

    struct FakeProvider {
        url: Option<String>,
        calls: AtomicUsize,
    }

    impl FakeProvider {
        fn with_url(url: Option<&str>) -> Arc<Self> {
            Arc::new(Self {
                url: url.map(str::to_string),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl MetadataProvider for FakeProvider {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn lyric(&self, _query: &TrackQuery) -> Result<Option<String>> {
            Ok(None)
        }

        async fn album_art_url(&self, _query: &TrackQuery) -> Result<Option<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.url.clone())
        }
    }

    fn jpeg_bytes() -> Vec<u8> {
        let image = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            4,
            4,
            image::Rgb([255, 0, 0]),
        ));
        let mut out = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Jpeg)
            .unwrap();
        out
    }

    fn ok(body: Vec<u8>) -> HttpResponse {
        HttpResponse {
            status: 200,
            headers: HashMap::new(),
            body: Bytes::from(body),
        }
    }

    fn resolver(dir: &Path, provider: Arc<FakeProvider>, http: MockHttp) -> CoverArtResolver {
        CoverArtResolver::new(
            Arc::new(TokioFileSystem::new()),
            dir.join("AlbumCover"),
            Some(RemoteArtwork {
                provider,
                http_client: Arc::new(http),
            }),
            Duration::from_secs(2),
        )
    }

    fn query() -> TrackQuery {
        TrackQuery::new(Some("Song".into()), Some("Artist".into()), Some("Album".into()))
    }

    #[test]
    fn test_detect_mime_type() {
        assert_eq!(detect_mime_type(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("image/jpeg"));
        assert_eq!(detect_mime_type(b"\x89PNG\r\n\x1a\n"), Some("image/png"));
        assert_eq!(detect_mime_type(b"RIFF\0\0\0\0WEBPVP8 "), Some("image/webp"));
        assert_eq!(detect_mime_type(b"nope"), None);
    }

    #[test]
    fn test_file_uri() {
        assert_eq!(file_uri(Path::new("/data/a.png")), "file:///data/a.png");
        assert_eq!(file_uri(Path::new("C:\\data\\a.png")), "file:///C:/data/a.png");
    }

    #[tokio::test]
    async fn test_embedded_picture_becomes_data_uri() {
        let temp = tempfile::tempdir().unwrap();
        let provider = FakeProvider::with_url(Some("https://img.example/x.jpg"));
        let resolver = resolver(temp.path(), provider.clone(), MockHttp::new());

        let sniffed = EmbeddedPicture {
            data: Bytes::from_static(&[0xFF, 0xD8, 0xFF, 0xE0]),
            mime_type: None,
        };
        let uri = resolver.resolve(&query(), Some(&sniffed)).await.unwrap();

        assert_eq!(uri, format!("data:image/jpeg;base64,{}", STANDARD.encode([0xFF, 0xD8, 0xFF, 0xE0])));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_album_has_no_cover() {
        let temp = tempfile::tempdir().unwrap();
        let provider = FakeProvider::with_url(Some("https://img.example/x.jpg"));
        let resolver = resolver(temp.path(), provider.clone(), MockHttp::new());

        let anonymous = TrackQuery::new(Some("Song".into()), None, None);

        assert_eq!(resolver.resolve(&anonymous, None).await, None);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_remote_cover_is_cached_as_png() {
        let temp = tempfile::tempdir().unwrap();
        let provider = FakeProvider::with_url(Some("https://img.example/x.jpg"));
        let mut http = MockHttp::new();
        http.expect_execute()
            .withf(|req| req.url == "https://img.example/x.jpg")
            .times(1)
            .returning(|_| Ok(ok(jpeg_bytes())));
        let resolver = resolver(temp.path(), provider.clone(), http);

        let first = resolver.resolve(&query(), None).await;
        assert_eq!(first.as_deref(), Some("https://img.example/x.jpg"));

        let path = resolver.art_path(Some("Artist"), Some("Album")).unwrap();
        let cached = std::fs::read(&path).unwrap();
        assert_eq!(detect_mime_type(&cached), Some("image/png"));

        let second = resolver.resolve(&query(), None).await;
        assert_eq!(second, Some(file_uri(&path)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_download_yields_none() {
        let temp = tempfile::tempdir().unwrap();
        let provider = FakeProvider::with_url(Some("https://img.example/x.jpg"));
        let mut http = MockHttp::new();
        http.expect_execute().times(1).returning(|_| {
            Ok(HttpResponse {
                status: 404,
                headers: HashMap::new(),
                body: Bytes::new(),
            })
        });
        let resolver = resolver(temp.path(), provider, http);

        assert_eq!(resolver.resolve(&query(), None).await, None);
        assert!(!resolver.art_dir().exists());
    }

    #[tokio::test]
    async fn test_undecodable_image_still_returns_url() {
        let temp = tempfile::tempdir().unwrap();
        let provider = FakeProvider::with_url(Some("https://img.example/x.jpg"));
        let mut http = MockHttp::new();
        http.expect_execute()
            .times(1)
            .returning(|_| Ok(ok(b"<html>not an image</html>".to_vec())));
        let resolver = resolver(temp.path(), provider, http);

        let url = resolver.resolve(&query(), None).await;

        assert_eq!(url.as_deref(), Some("https://img.example/x.jpg"));
        let path = resolver.art_path(Some("Artist"), Some("Album")).unwrap();
        assert!(!path.exists());
    }

    struct StalledHttp;

    #[async_trait]
    impl HttpClient for StalledHttp {
        async fn execute(&self, _request: HttpRequest) -> bridge_traits::error::Result<HttpResponse> {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Ok(ok(jpeg_bytes()))
        }
    }

    #[tokio::test]
    async fn test_slow_download_gives_up_at_timeout() {
        let temp = tempfile::tempdir().unwrap();
        let timeout = Duration::from_millis(200);
        let resolver = CoverArtResolver::new(
            Arc::new(TokioFileSystem::new()),
            temp.path().join("AlbumCover"),
            Some(RemoteArtwork {
                provider: FakeProvider::with_url(Some("https://img.example/x.jpg")),
                http_client: Arc::new(StalledHttp),
            }),
            timeout,
        );

        let started = std::time::Instant::now();
        let cover = resolver.resolve(&query(), None).await;

        assert_eq!(cover, None);
        assert!(started.elapsed() < Duration::from_secs(1), "{:?}", started.elapsed());
        assert!(!resolver.art_dir().exists());
    }

    #[tokio::test]
    async fn test_offline_resolver_uses_cache_only() {
        let temp = tempfile::tempdir().unwrap();
        let resolver = CoverArtResolver::new(
            Arc::new(TokioFileSystem::new()),
            temp.path().join("AlbumCover"),
            None,
            Duration::from_secs(1),
        );

        assert_eq!(resolver.resolve(&query(), None).await, None);

        let path = resolver.art_path(Some("Artist"), Some("Album")).unwrap();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"png").unwrap();
        assert_eq!(resolver.resolve(&query(), None).await, Some(file_uri(&path)));
    }
}
