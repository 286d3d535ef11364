use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Failed to extract metadata: {0}")]
    ExtractionFailed(String),

    #[error("Artwork processing failed: {0}")]
    ArtworkError(String),

    #[error("Image processing error: {0}")]
    ImageError(String),

    #[error("Remote API error: {0}")]
    RemoteApi(String),

    #[error("Provider timed out after {0:?}")]
    ProviderTimeout(std::time::Duration),

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::error::BridgeError),
}

pub type Result<T> = std::result::Result<T, MetadataError>;
