//! # Track Metadata Resolution
//!
//! Builds a best-effort [`TrackMetadata`](core_library::TrackMetadata) record
//! for a single audio file from three sources:
//!
//! - embedded tags and stream properties ([`extractor`])
//! - the `.lrc` sidecar and a remote lyric provider ([`lyrics`])
//! - embedded art, the shared album cover cache and a remote provider
//!   ([`artwork`])
//!
//! Every source may fail independently; failures degrade to `null` fields or
//! an unavailable lyric, never to an error for the caller.

pub mod artwork;
pub mod error;
pub mod extractor;
pub mod lyrics;
pub mod providers;
pub mod track_service;

pub use artwork::{CoverArtResolver, RemoteArtwork};
pub use error::{MetadataError, Result};
pub use extractor::{EmbeddedMetadata, EmbeddedPicture, MetadataReader};
pub use lyrics::LyricResolver;
pub use providers::{MetadataProvider, NeteaseProvider, TrackQuery};
pub use track_service::TrackMetadataService;
