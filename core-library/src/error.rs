use crate::cache::CacheError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// A fresh scan found no audio files under the root.
    #[error("target path is empty: {0}")]
    EmptyLibrary(String),
}

pub type Result<T> = std::result::Result<T, LibraryError>;
