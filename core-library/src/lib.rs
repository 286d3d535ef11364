//! # Library Management Module
//!
//! Turns a library root into a list of audio files, backed by a two-tier
//! on-disk cache.
//!
//! ## Overview
//!
//! This module manages:
//! - Recursive directory scanning with bounded, loop-safe traversal
//! - Case-insensitive audio extension classification
//! - The short (`<digest>.json`) and full (`<digest>-full.json`) cache tiers
//! - Per-root single-flight guarding of rescans
//!
//! The listing service consults the full tier, then the short tier, and only
//! walks the filesystem when both are empty.

pub mod cache;
pub mod digest;
pub mod error;
pub mod filter;
pub mod listing;
pub mod models;
pub mod scanner;
pub mod single_flight;

pub use cache::{CacheError, CacheTier, LibraryCacheStore};
pub use error::{LibraryError, Result};
pub use filter::AudioFilter;
pub use listing::LibraryListingService;
pub use models::{
    FieldSet, LibraryEntry, LibraryListing, LyricOutcome, MetadataField, TrackMetadata,
};
pub use scanner::{DirectoryScanner, FileScanner, ScanError, ScanOptions, ScanOutcome};
pub use single_flight::KeyedLocks;
