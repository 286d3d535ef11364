//! Domain models for the media library
//!
//! These are the shapes persisted in the cache tiers and returned to callers.
//! Optional fields serialize as `null` rather than being omitted so a record
//! always carries the full key set.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

// =============================================================================
// Listing
// =============================================================================

/// One file classified as audio. The short tier stores a list of these.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LibraryEntry {
    /// Absolute path of the file
    pub src: PathBuf,
}

impl LibraryEntry {
    pub fn new(src: impl Into<PathBuf>) -> Self {
        Self { src: src.into() }
    }
}

/// Result of listing a library root.
///
/// Serializes as a bare array of whichever record type the tier holds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LibraryListing {
    /// Served from the full tier
    Full(Vec<TrackMetadata>),
    /// Served from the short tier or a fresh scan
    Short(Vec<LibraryEntry>),
}

impl LibraryListing {
    pub fn len(&self) -> usize {
        match self {
            LibraryListing::Full(records) => records.len(),
            LibraryListing::Short(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Paths of every listed file, in listing order.
    pub fn sources(&self) -> Vec<PathBuf> {
        match self {
            LibraryListing::Full(records) => records.iter().map(|r| r.src.clone()).collect(),
            LibraryListing::Short(entries) => entries.iter().map(|e| e.src.clone()).collect(),
        }
    }
}

// =============================================================================
// Metadata fields
// =============================================================================

/// A requestable attribute of [`TrackMetadata`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataField {
    Title,
    Artist,
    Artists,
    Album,
    Genre,
    Date,
    Duration,
    Picture,
    Lyric,
}

impl MetadataField {
    pub const ALL: [MetadataField; 9] = [
        MetadataField::Title,
        MetadataField::Artist,
        MetadataField::Artists,
        MetadataField::Album,
        MetadataField::Genre,
        MetadataField::Date,
        MetadataField::Duration,
        MetadataField::Picture,
        MetadataField::Lyric,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataField::Title => "title",
            MetadataField::Artist => "artist",
            MetadataField::Artists => "artists",
            MetadataField::Album => "album",
            MetadataField::Genre => "genre",
            MetadataField::Date => "date",
            MetadataField::Duration => "duration",
            MetadataField::Picture => "picture",
            MetadataField::Lyric => "lyric",
        }
    }
}

impl fmt::Display for MetadataField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetadataField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetadataField::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| format!("unknown metadata field: {}", s))
    }
}

/// Set of requested fields. Defaults to every field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldSet(BTreeSet<MetadataField>);

impl FieldSet {
    pub fn all() -> Self {
        Self(MetadataField::ALL.into_iter().collect())
    }

    pub fn only(fields: impl IntoIterator<Item = MetadataField>) -> Self {
        Self(fields.into_iter().collect())
    }

    /// `None` means "everything", matching an omitted request parameter.
    pub fn from_request(fields: Option<Vec<MetadataField>>) -> Self {
        fields.map(Self::only).unwrap_or_default()
    }

    pub fn contains(&self, field: MetadataField) -> bool {
        self.0.contains(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = MetadataField> + '_ {
        self.0.iter().copied()
    }
}

impl Default for FieldSet {
    fn default() -> Self {
        Self::all()
    }
}

// =============================================================================
// Track metadata
// =============================================================================

/// Outcome of a lyric lookup.
///
/// Serializes as `{"text": "..."}` or `{"unavailable": "reason"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LyricOutcome {
    Text(String),
    Unavailable(String),
}

impl LyricOutcome {
    pub fn text(&self) -> Option<&str> {
        match self {
            LyricOutcome::Text(text) => Some(text),
            LyricOutcome::Unavailable(_) => None,
        }
    }
}

/// Best-effort metadata for one audio file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackMetadata {
    pub src: PathBuf,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub artists: Option<Vec<String>>,
    pub album: Option<String>,
    pub genre: Option<Vec<String>>,
    pub date: Option<String>,
    /// Seconds
    pub duration: Option<f64>,
    /// `data:` URI, `file://` URI or remote URL
    pub picture: Option<String>,
    pub lyric: Option<LyricOutcome>,
}

impl TrackMetadata {
    /// A record for `src` with every field unresolved.
    pub fn unresolved(src: impl Into<PathBuf>) -> Self {
        Self {
            src: src.into(),
            ..Self::default()
        }
    }

    /// Null out every field not in `fields`.
    pub fn retain(mut self, fields: &FieldSet) -> Self {
        for field in MetadataField::ALL {
            if fields.contains(field) {
                continue;
            }
            match field {
                MetadataField::Title => self.title = None,
                MetadataField::Artist => self.artist = None,
                MetadataField::Artists => self.artists = None,
                MetadataField::Album => self.album = None,
                MetadataField::Genre => self.genre = None,
                MetadataField::Date => self.date = None,
                MetadataField::Duration => self.duration = None,
                MetadataField::Picture => self.picture = None,
                MetadataField::Lyric => self.lyric = None,
            }
        }
        self
    }
}
