//! Embedded Tag Extraction
//!
//! Reads the tag block and stream properties of an audio file with `lofty`.
//! Parsing is blocking I/O, so it runs on the blocking thread pool.
//!
//! [`MetadataReader::read`] never fails: a missing, unsupported or corrupt file
//! yields [`EmbeddedMetadata::default`]. Use [`MetadataReader::try_read`] to
//! observe the failure.
//!
//! ## Usage
//!
//! ```ignore
//! use core_metadata::extractor::MetadataReader;
//! use std::path::Path;
//!
//! let reader = MetadataReader::new();
//! let embedded = reader.read(Path::new("/music/song.flac")).await;
//! println!("Title: {}", embedded.title.unwrap_or_default());
//! ```

use bytes::Bytes;
use lofty::config::ParseOptions;
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey, Tag};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

use crate::error::{MetadataError, Result};

/// Cover image stored inside the audio file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedPicture {
    pub data: Bytes,
    /// MIME type declared by the tag, if any
    pub mime_type: Option<String>,
}

/// Values read from the file itself, before any remote enrichment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbeddedMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub artists: Option<Vec<String>>,
    pub album: Option<String>,
    pub genre: Option<Vec<String>>,
    /// Recording date, or the year when only that is tagged
    pub date: Option<String>,
    /// Seconds
    pub duration: Option<f64>,
    pub picture: Option<EmbeddedPicture>,
}

/// Audio tag reader.
#[derive(Debug, Clone)]
pub struct MetadataReader {
    parse_options: ParseOptions,
}

impl MetadataReader {
    pub fn new() -> Self {
        Self {
            parse_options: ParseOptions::new(),
        }
    }

    /// Read embedded metadata, degrading to an empty record on any failure.
    pub async fn read(&self, path: &Path) -> EmbeddedMetadata {
        match self.try_read(path).await {
            Ok(metadata) => metadata,
            Err(e) => {
                debug!(file = %path.display(), error = %e, "No embedded metadata");
                EmbeddedMetadata::default()
            }
        }
    }

    /// Read embedded metadata.
    ///
    /// # Errors
    ///
    /// [`MetadataError::ExtractionFailed`] when the file cannot be opened,
    /// is not a recognised audio format, or its tags cannot be parsed.
    #[instrument(skip_all, fields(file = %path.display()))]
    pub async fn try_read(&self, path: &Path) -> Result<EmbeddedMetadata> {
        let options = self.parse_options;
        let owned: PathBuf = path.to_path_buf();

        tokio::task::spawn_blocking(move || Self::read_blocking(options, &owned))
            .await
            .map_err(|e| MetadataError::ExtractionFailed(format!("read task failed: {}", e)))?
    }

    fn read_blocking(options: ParseOptions, path: &Path) -> Result<EmbeddedMetadata> {
        let tagged_file = Probe::open(path)
            .map_err(|e| MetadataError::ExtractionFailed(format!("Failed to open file: {}", e)))?
            .options(options)
            .guess_file_type()
            .map_err(|e| {
                MetadataError::ExtractionFailed(format!("Failed to detect file type: {}", e))
            })?
            .read()
            .map_err(|e| MetadataError::ExtractionFailed(format!("Failed to parse file: {}", e)))?;

        let duration = tagged_file.properties().duration().as_secs_f64();
        let mut metadata = EmbeddedMetadata {
            duration: (duration > 0.0).then_some(duration),
            ..EmbeddedMetadata::default()
        };

        let tag = match tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) {
            Some(tag) => tag,
            None => {
                debug!("File has no tags");
                return Ok(metadata);
            }
        };

        metadata.title = tag.title().as_deref().and_then(clean_text);
        metadata.artist = tag.artist().as_deref().and_then(clean_text);
        metadata.album = tag.album().as_deref().and_then(clean_text);
        metadata.artists = Self::artists(tag, metadata.artist.as_deref());
        metadata.genre = non_empty(tag.get_strings(&ItemKey::Genre).filter_map(clean_text));
        metadata.date = tag
            .get_string(&ItemKey::RecordingDate)
            .and_then(clean_text)
            .or_else(|| tag.year().map(|year| year.to_string()));
        metadata.picture = Self::cover(tag.pictures());

        Ok(metadata)
    }

    /// Every track artist value, falling back to the single artist.
    fn artists(tag: &Tag, artist: Option<&str>) -> Option<Vec<String>> {
        non_empty(tag.get_strings(&ItemKey::TrackArtist).filter_map(clean_text))
            .or_else(|| artist.map(|artist| vec![artist.to_string()]))
    }

    /// Front cover when tagged as such, otherwise the first picture.
    fn cover(pictures: &[Picture]) -> Option<EmbeddedPicture> {
        let picture = pictures
            .iter()
            .filter(|pic| !pic.data().is_empty())
            .find(|pic| pic.pic_type() == PictureType::CoverFront)
            .or_else(|| pictures.iter().find(|pic| !pic.data().is_empty()))?;

        Some(EmbeddedPicture {
            data: Bytes::copy_from_slice(picture.data()),
            mime_type: picture.mime_type().and_then(mime_type_to_string),
        })
    }
}

impl Default for MetadataReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Collapse whitespace and drop control characters. Blank input is `None`.
fn clean_text(text: &str) -> Option<String> {
    let normalized: String = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .filter(|c| !c.is_control())
        .collect();

    (!normalized.is_empty()).then_some(normalized)
}

fn non_empty(values: impl Iterator<Item = String>) -> Option<Vec<String>> {
    let values: Vec<String> = values.collect();
    (!values.is_empty()).then_some(values)
}

fn mime_type_to_string(mime_type: &MimeType) -> Option<String> {
    let mime = match mime_type {
        MimeType::Png => "image/png",
        MimeType::Jpeg => "image/jpeg",
        MimeType::Tiff => "image/tiff",
        MimeType::Bmp => "image/bmp",
        MimeType::Gif => "image/gif",
        MimeType::Unknown(other) if other.starts_with("image/") => return Some(other.clone()),
        _ => return None,
    };
    Some(mime.to_string())
}
