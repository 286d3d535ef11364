//! Metadata resolution against real files, a real cache directory and a
//! scripted NetEase backend.

use async_trait::async_trait;
use bridge_desktop::TokioFileSystem;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bytes::Bytes;
use core_library::{FieldSet, LyricOutcome, MetadataField};
use core_metadata::TrackMetadataService;
use core_runtime::config::{CoreConfig, FeatureFlags, ProviderConfig};
use lofty::config::WriteOptions;
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::tag::{Accessor, Tag, TagExt, TagType};
use serde_json::Value;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const BASE_URL: &str = "https://music.example";
const COVER_URL: &str = "https://img.example/cover.jpg";

/// Answers the three NetEase endpoints plus the cover download.
#[derive(Default)]
struct ScriptedNetease {
    searches: AtomicUsize,
    lyrics: AtomicUsize,
    downloads: AtomicUsize,
}

fn respond(status: u16, body: impl Into<Bytes>) -> HttpResponse {
    HttpResponse {
        status,
        headers: HashMap::new(),
        body: body.into(),
    }
}

#[async_trait]
impl HttpClient for ScriptedNetease {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        let url = request.url.as_str();
        if url.starts_with(&format!("{}/api/search/get/web", BASE_URL)) {
            self.searches.fetch_add(1, Ordering::SeqCst);
            let body = format!(
                r#"{{"result":{{"songs":[{{"id":7,"album":{{"id":3,"picUrl":"{}"}}}}]}},"code":200}}"#,
                COVER_URL
            );
            Ok(respond(200, body))
        } else if url.starts_with(&format!("{}/api/song/lyric", BASE_URL)) {
            self.lyrics.fetch_add(1, Ordering::SeqCst);
            Ok(respond(200, r#"{"lrc":{"lyric":"[00:00.50]remote words"}}"#))
        } else if url == COVER_URL {
            self.downloads.fetch_add(1, Ordering::SeqCst);
            Ok(respond(200, jpeg_bytes()))
        } else {
            Err(BridgeError::OperationFailed(format!("unexpected url {}", url)))
        }
    }
}

struct Fixture {
    library: TempDir,
    app_data: TempDir,
    http: Arc<ScriptedNetease>,
    service: TrackMetadataService,
}

impl Fixture {
    fn new(features: FeatureFlags) -> Self {
        let library = tempfile::tempdir().unwrap();
        let app_data = tempfile::tempdir().unwrap();
        let http = Arc::new(ScriptedNetease::default());

        let config = CoreConfig::builder()
            .app_data_dir(app_data.path())
            .file_system(Arc::new(TokioFileSystem::new()))
            .http_client(http.clone())
            .provider(ProviderConfig::new(BASE_URL))
            .remote_timeout(Duration::from_secs(2))
            .features(features)
            .build()
            .unwrap();

        Self {
            library,
            app_data,
            http,
            service: TrackMetadataService::from_config(&config),
        }
    }

    fn online() -> Self {
        Self::new(FeatureFlags::default())
    }

    fn track(&self, name: &str) -> PathBuf {
        self.library.path().join(name)
    }
}

/// One second of 8 kHz mono 8-bit PCM silence.
fn wav_bytes() -> Vec<u8> {
    let samples = vec![128u8; 8000];
    let mut out = Vec::new();
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + samples.len() as u32).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&8000u32.to_le_bytes());
    out.extend_from_slice(&8000u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&8u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&(samples.len() as u32).to_le_bytes());
    out.extend_from_slice(&samples);
    out
}

fn image_bytes(format: image::ImageFormat) -> Vec<u8> {
    let image = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        4,
        4,
        image::Rgb([0, 128, 255]),
    ));
    let mut out = Vec::new();
    image.write_to(&mut Cursor::new(&mut out), format).unwrap();
    out
}

fn jpeg_bytes() -> Vec<u8> {
    image_bytes(image::ImageFormat::Jpeg)
}

fn tagged_wav(path: &Path, title: &str, artist: &str, album: &str, cover: Option<Vec<u8>>) {
    std::fs::write(path, wav_bytes()).unwrap();

    let mut tag = Tag::new(TagType::Id3v2);
    tag.set_title(title.to_string());
    tag.set_artist(artist.to_string());
    tag.set_album(album.to_string());
    tag.set_genre("Ambient".to_string());
    if let Some(data) = cover {
        tag.push_picture(Picture::new_unchecked(
            PictureType::CoverFront,
            Some(MimeType::Png),
            None,
            data,
        ));
    }
    tag.save_to_path(path, WriteOptions::default()).unwrap();
}

#[tokio::test]
async fn test_embedded_tags_are_read() {
    let fixture = Fixture::new(FeatureFlags::offline());
    let track = fixture.track("tagged.wav");
    tagged_wav(&track, "Morning", "Someone", "Daylight", None);

    let record = fixture
        .service
        .get_metadata(&track, &FieldSet::all())
        .await;

    assert_eq!(record.title.as_deref(), Some("Morning"));
    assert_eq!(record.artist.as_deref(), Some("Someone"));
    assert_eq!(record.artists, Some(vec!["Someone".to_string()]));
    assert_eq!(record.album.as_deref(), Some("Daylight"));
    assert_eq!(record.genre, Some(vec!["Ambient".to_string()]));
    let duration = record.duration.unwrap();
    assert!((0.9..1.1).contains(&duration), "duration {}", duration);
}

#[tokio::test]
async fn test_embedded_cover_is_inlined() {
    let fixture = Fixture::online();
    let track = fixture.track("cover.wav");
    tagged_wav(
        &track,
        "Song",
        "Someone",
        "Daylight",
        Some(image_bytes(image::ImageFormat::Png)),
    );

    let record = fixture
        .service
        .get_metadata(&track, &FieldSet::only([MetadataField::Picture]))
        .await;

    let picture = record.picture.unwrap();
    assert!(picture.starts_with("data:image/png;base64,"));
    assert_eq!(fixture.http.downloads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_lyric_round_trip_through_sidecar() {
    let fixture = Fixture::online();
    let track = fixture.track("song.wav");
    tagged_wav(&track, "Song", "Someone", "Daylight", None);
    let lyric_only = FieldSet::only([MetadataField::Lyric]);

    let first = fixture.service.get_metadata(&track, &lyric_only).await;
    let second = fixture.service.get_metadata(&track, &lyric_only).await;

    let expected = Some(LyricOutcome::Text("[00:00.50]remote words".into()));
    assert_eq!(first.lyric, expected);
    assert_eq!(second.lyric, expected);
    assert_eq!(fixture.http.lyrics.load(Ordering::SeqCst), 1);
    assert_eq!(
        std::fs::read_to_string(fixture.track("song.lrc")).unwrap(),
        "[00:00.50]remote words"
    );
}

#[tokio::test]
async fn test_album_art_is_shared_across_tracks() {
    let fixture = Fixture::online();
    let first_track = fixture.track("01.wav");
    let second_track = fixture.track("02.wav");
    tagged_wav(&first_track, "One", "Someone", "Daylight", None);
    tagged_wav(&second_track, "Two", "Someone", "Daylight", None);
    let picture_only = FieldSet::only([MetadataField::Picture]);

    let first = fixture.service.get_metadata(&first_track, &picture_only).await;
    let second = fixture.service.get_metadata(&second_track, &picture_only).await;

    assert_eq!(first.picture.as_deref(), Some(COVER_URL));
    let cached = second.picture.unwrap();
    assert!(cached.starts_with("file://"), "{}", cached);
    assert!(cached.ends_with(".png"));
    assert_eq!(fixture.http.downloads.load(Ordering::SeqCst), 1);

    let cover_dir = fixture.app_data.path().join("AlbumCover");
    assert_eq!(std::fs::read_dir(cover_dir).unwrap().count(), 1);
}

#[tokio::test]
async fn test_record_always_carries_every_key() {
    let fixture = Fixture::online();
    let track = fixture.track("plain.wav");
    tagged_wav(&track, "Song", "Someone", "Daylight", None);

    let record = fixture
        .service
        .get_metadata(&track, &FieldSet::only([MetadataField::Title]))
        .await;
    let value = serde_json::to_value(&record).unwrap();
    let object = value.as_object().unwrap();

    assert_eq!(object["title"], Value::from("Song"));
    for field in MetadataField::ALL {
        if field != MetadataField::Title {
            assert_eq!(object[field.as_str()], Value::Null, "{}", field);
        }
    }
    assert_eq!(fixture.http.searches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_offline_untagged_file_degrades() {
    let fixture = Fixture::new(FeatureFlags::offline());
    let track = fixture.track("mystery.mp3");
    std::fs::write(&track, b"garbage").unwrap();

    let record = fixture
        .service
        .get_metadata(&track, &FieldSet::all())
        .await;

    assert_eq!(record.title.as_deref(), Some("mystery"));
    assert!(record.artist.is_none());
    assert!(record.picture.is_none());
    assert!(matches!(record.lyric, Some(LyricOutcome::Unavailable(_))));
    assert_eq!(fixture.http.searches.load(Ordering::SeqCst), 0);
}
