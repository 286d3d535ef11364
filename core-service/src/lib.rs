//! Core service façade and bootstrap helpers.
//!
//! [`CoreService`] is the request surface a host talks to. It wires the
//! listing and metadata services to the bridges in a [`CoreConfig`] and wraps
//! every result in a [`ServiceResponse`] envelope. Desktop hosts typically
//! enable the `desktop-shims` feature and call [`bootstrap_desktop`].
//!
//! ```ignore
//! use core_service::{bootstrap_desktop, init_logging, LoggingConfig};
//! use std::path::Path;
//!
//! init_logging(LoggingConfig::default())?;
//! let core = bootstrap_desktop()?;
//! let listing = core.list_library(Path::new("/music")).await;
//! ```

pub mod error;
pub mod response;

pub use error::{CoreError, Result};
pub use response::{LibraryListingData, ServiceResponse};

pub use core_library::{FieldSet, LibraryEntry, LibraryListing, LyricOutcome, MetadataField, TrackMetadata};
pub use core_runtime::config::{CoreConfig, FeatureFlags, ProviderConfig};
pub use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};

use core_library::LibraryListingService;
use core_metadata::TrackMetadataService;
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    config: Arc<CoreConfig>,
    listing: Arc<LibraryListingService>,
    metadata: Arc<TrackMetadataService>,
}

impl CoreService {
    /// Create a service from a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Runtime`] when the configuration fails validation.
    pub fn new(config: CoreConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            listing: Arc::new(LibraryListingService::from_config(&config)),
            metadata: Arc::new(TrackMetadataService::from_config(&config)),
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// List the audio files under `root`.
    pub async fn list_library(&self, root: &Path) -> ServiceResponse<LibraryListingData<LibraryListing>> {
        self.try_list_library(root)
            .await
            .map(|lists| LibraryListingData { lists })
            .into()
    }

    pub async fn try_list_library(&self, root: &Path) -> Result<LibraryListing> {
        Ok(self.listing.list(root).await?)
    }

    /// Metadata for one file. `fields: None` requests every field.
    pub async fn get_file_metadata(
        &self,
        path: &Path,
        fields: Option<Vec<MetadataField>>,
    ) -> ServiceResponse<TrackMetadata> {
        let fields = FieldSet::from_request(fields);
        ServiceResponse::success(self.metadata.get_metadata(path, &fields).await)
    }

    /// Resolve metadata for every file under `root` and persist it as the
    /// full tier, so later listings return complete records.
    pub async fn build_full_index(
        &self,
        root: &Path,
        fields: Option<Vec<MetadataField>>,
    ) -> ServiceResponse<LibraryListingData<Vec<TrackMetadata>>> {
        let fields = FieldSet::from_request(fields);
        self.try_build_full_index(root, &fields)
            .await
            .map(|lists| LibraryListingData { lists })
            .into()
    }

    /// Records come back in listing order regardless of completion order.
    #[instrument(skip_all, fields(root = %root.display()))]
    pub async fn try_build_full_index(
        &self,
        root: &Path,
        fields: &FieldSet,
    ) -> Result<Vec<TrackMetadata>> {
        let sources = self.listing.list(root).await?.sources();
        let metadata = &self.metadata;

        let mut indexed: Vec<(usize, TrackMetadata)> = stream::iter(sources.into_iter().enumerate())
            .map(|(position, src)| async move {
                (position, metadata.get_metadata(&src, fields).await)
            })
            .buffer_unordered(self.config.index_concurrency.max(1))
            .collect()
            .await;
        indexed.sort_by_key(|(position, _)| *position);

        let records: Vec<TrackMetadata> = indexed.into_iter().map(|(_, record)| record).collect();

        if let Err(e) = self.listing.cache().write_full(root, &records).await {
            warn!(error = %e, "Failed to persist full index");
        }

        info!(count = records.len(), "Full index built");
        Ok(records)
    }
}

/// Service over the desktop bridges and the default app data directory.
#[cfg(feature = "desktop-shims")]
pub fn bootstrap_desktop() -> Result<CoreService> {
    let config = CoreConfig::builder()
        .build()
        .map_err(|e| CoreError::InitializationFailed(e.to_string()))?;
    CoreService::new(config)
}
