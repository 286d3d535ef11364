//! # Core Configuration Module
//!
//! Provides configuration management for the media library core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds all dependencies and settings for the library listing and
//! metadata resolution services. It enforces fail-fast validation so a missing
//! bridge or a nonsensical limit surfaces at startup instead of on first use.
//!
//! ## Required Dependencies
//!
//! - `FileSystemAccess` - Cache artifacts, lyric sidecars, album art cache
//! - An application data directory
//!
//! ## Optional Dependencies (with platform defaults)
//!
//! - `HttpClient` - Remote lyric and album art lookups (desktop default: reqwest)
//!
//! When the `desktop-shims` feature is enabled, desktop-ready defaults for the
//! file system, the HTTP client and the application data directory are injected
//! automatically if not provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .app_data_dir("/home/me/.local/share/media-library-core")
//!     .enable_lyrics(true)
//!     .build()?;
//!
//! assert!(config.library_cache_dir().ends_with("MusicLibrary"));
//! ```

use crate::error::{Error, Result};
use bridge_traits::{FileSystemAccess, HttpClient};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Directory under the app data dir that holds the listing cache artifacts.
pub const LIBRARY_CACHE_DIR_NAME: &str = "MusicLibrary";

/// Directory under the app data dir that holds cached album art.
pub const ART_CACHE_DIR_NAME: &str = "AlbumCover";

/// Extensions recognized as audio when none are configured.
pub const DEFAULT_AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "flac", "wav", "ogg", "m4a", "aac", "ape", "opus", "wma",
];

const DEFAULT_SCAN_MAX_DEPTH: usize = 64;
const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_INDEX_CONCURRENCY: usize = 8;

/// Core configuration for the media library core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Root of all persisted state (listing cache and album art cache)
    pub app_data_dir: PathBuf,

    /// Lowercase file extensions, without the dot, treated as audio
    pub audio_extensions: Vec<String>,

    /// Maximum directory depth walked below a library root
    pub scan_max_depth: usize,

    /// Whether the scanner descends into symbolic links
    pub follow_symlinks: bool,

    /// Upper bound for a single remote provider call or art download
    pub remote_timeout: Duration,

    /// Number of tracks resolved concurrently while building a full index
    pub index_concurrency: usize,

    /// HTTP client for remote lookups (optional with desktop default)
    pub http_client: Option<Arc<dyn HttpClient>>,

    /// File system access abstraction (required, desktop default available)
    pub file_system: Arc<dyn FileSystemAccess>,

    /// Feature flags
    pub features: FeatureFlags,

    /// Remote metadata provider configuration
    pub provider: ProviderConfig,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("app_data_dir", &self.app_data_dir)
            .field("audio_extensions", &self.audio_extensions)
            .field("scan_max_depth", &self.scan_max_depth)
            .field("follow_symlinks", &self.follow_symlinks)
            .field("remote_timeout", &self.remote_timeout)
            .field("index_concurrency", &self.index_concurrency)
            .field(
                "http_client",
                &self.http_client.as_ref().map(|_| "HttpClient { ... }"),
            )
            .field("file_system", &"FileSystemAccess { ... }")
            .field("features", &self.features)
            .field("provider", &self.provider)
            .finish()
    }
}

/// Feature flags control optional functionality.
///
/// Both flags need an `HttpClient`; with them off the resolvers only consult
/// local sidecars and the art cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Fetch lyrics from the remote provider when no sidecar exists
    pub enable_lyrics: bool,

    /// Fetch album art from the remote provider when neither the file nor the
    /// art cache has one
    pub enable_artwork_remote: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enable_lyrics: true,
            enable_artwork_remote: true,
        }
    }
}

impl FeatureFlags {
    /// Flags with every remote lookup disabled.
    pub fn offline() -> Self {
        Self {
            enable_lyrics: false,
            enable_artwork_remote: false,
        }
    }

    pub fn any_remote(&self) -> bool {
        self.enable_lyrics || self.enable_artwork_remote
    }
}

/// Configuration for the remote metadata provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Base URL of the provider API, without a trailing slash
    pub base_url: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://music.163.com".to_string(),
        }
    }
}

impl ProviderConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(Error::Config(
                "Provider base URL cannot be empty".to_string(),
            ));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "Provider base URL must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }

        Ok(())
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Directory holding `<digest>.json` and `<digest>-full.json` artifacts.
    pub fn library_cache_dir(&self) -> PathBuf {
        self.app_data_dir.join(LIBRARY_CACHE_DIR_NAME)
    }

    /// Directory holding `<digest>.png` album art shared across roots.
    pub fn art_cache_dir(&self) -> PathBuf {
        self.app_data_dir.join(ART_CACHE_DIR_NAME)
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - The app data directory is not empty
    /// - At least one audio extension is configured
    /// - Depth, timeout and concurrency limits are in range
    /// - Remote features have an `HttpClient` to run on
    pub fn validate(&self) -> Result<()> {
        if self.app_data_dir.as_os_str().is_empty() {
            return Err(Error::Config(
                "App data directory cannot be empty".to_string(),
            ));
        }

        if self.audio_extensions.is_empty() {
            return Err(Error::Config(
                "At least one audio extension must be configured".to_string(),
            ));
        }

        if let Some(bad) = self
            .audio_extensions
            .iter()
            .find(|ext| ext.is_empty() || ext.starts_with('.'))
        {
            return Err(Error::Config(format!(
                "Audio extension '{}' is invalid. Use bare extensions such as 'mp3'.",
                bad
            )));
        }

        if self.scan_max_depth == 0 {
            return Err(Error::Config(
                "Scan depth must be at least 1".to_string(),
            ));
        }

        if self.remote_timeout.is_zero() {
            return Err(Error::Config(
                "Remote timeout must be greater than 0".to_string(),
            ));
        }

        if self.remote_timeout > Duration::from_secs(300) {
            return Err(Error::Config(
                "Remote timeout exceeds maximum of 300 seconds".to_string(),
            ));
        }

        if self.index_concurrency == 0 || self.index_concurrency > 256 {
            return Err(Error::Config(
                "Index concurrency must be between 1 and 256".to_string(),
            ));
        }

        if self.features.any_remote() && self.http_client.is_none() {
            return Err(Error::Config(
                "Remote lyrics or artwork enabled but no HttpClient provided. \
                 Disable the features or inject an HttpClient implementation."
                    .to_string(),
            ));
        }

        self.provider.validate()
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn file_system_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "FileSystemAccess".to_string(),
        message: "FileSystemAccess implementation is required for the library caches. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default TokioFileSystem. \
                 Other hosts: inject a platform file system bridge."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    use bridge_desktop::TokioFileSystem;

    let fs: Arc<dyn FileSystemAccess> = Arc::new(TokioFileSystem::new());
    Ok(fs)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    Err(file_system_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(timeout: Duration) -> Option<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    match ReqwestHttpClient::with_timeout(timeout) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            tracing::warn!(error = %e, "Default HTTP client unavailable");
            None
        }
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(_timeout: Duration) -> Option<Arc<dyn HttpClient>> {
    None
}

#[cfg(feature = "desktop-shims")]
fn provide_default_app_data_dir() -> Result<PathBuf> {
    Ok(bridge_desktop::TokioFileSystem::default_app_data_dir())
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_app_data_dir() -> Result<PathBuf> {
    Err(Error::Config(
        "App data directory is required. Use .app_data_dir() to set it.".to_string(),
    ))
}

/// Builder for constructing [`CoreConfig`] instances.
///
/// Call [`build()`](CoreConfigBuilder::build) to create the final config.
/// The builder fills in platform defaults and validates the result.
#[derive(Default)]
pub struct CoreConfigBuilder {
    app_data_dir: Option<PathBuf>,
    audio_extensions: Option<Vec<String>>,
    scan_max_depth: Option<usize>,
    follow_symlinks: Option<bool>,
    remote_timeout: Option<Duration>,
    index_concurrency: Option<usize>,
    http_client: Option<Arc<dyn HttpClient>>,
    file_system: Option<Arc<dyn FileSystemAccess>>,
    features: Option<FeatureFlags>,
    provider: Option<ProviderConfig>,
}

impl CoreConfigBuilder {
    /// Sets the application data directory.
    ///
    /// Listing caches land in `<dir>/MusicLibrary`, album art in
    /// `<dir>/AlbumCover`.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder()
    ///     .app_data_dir("/var/lib/media-library");
    /// ```
    pub fn app_data_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.app_data_dir = Some(path.into());
        self
    }

    /// Sets the extensions recognized as audio.
    ///
    /// Values are lowercased; a leading dot is rejected by validation.
    pub fn audio_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.audio_extensions = Some(
            extensions
                .into_iter()
                .map(|ext| ext.as_ref().to_ascii_lowercase())
                .collect(),
        );
        self
    }

    /// Sets the maximum scan depth.
    ///
    /// Default: 64
    pub fn scan_max_depth(mut self, depth: usize) -> Self {
        self.scan_max_depth = Some(depth);
        self
    }

    /// Sets whether symbolic links are followed during scans.
    ///
    /// Default: true
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = Some(follow);
        self
    }

    /// Sets the timeout applied to each remote call.
    ///
    /// Default: 10 seconds
    pub fn remote_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout = Some(timeout);
        self
    }

    /// Sets how many tracks are resolved at once when building a full index.
    ///
    /// Default: 8
    pub fn index_concurrency(mut self, limit: usize) -> Self {
        self.index_concurrency = Some(limit);
        self
    }

    /// Sets the HTTP client implementation.
    ///
    /// If not provided, the desktop default (reqwest-based) will be used when
    /// the `desktop-shims` feature is enabled.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// use core_runtime::config::CoreConfig;
    /// use std::sync::Arc;
    ///
    /// let builder = CoreConfig::builder()
    ///     .http_client(Arc::new(MyHttpClient));
    /// ```
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the file system access implementation.
    ///
    /// If not provided, the desktop default (tokio fs-based) will be used when
    /// the `desktop-shims` feature is enabled.
    pub fn file_system(mut self, fs: Arc<dyn FileSystemAccess>) -> Self {
        self.file_system = Some(fs);
        self
    }

    /// Enables or disables remote lyric lookups.
    ///
    /// Default: true
    pub fn enable_lyrics(mut self, enabled: bool) -> Self {
        self.features.get_or_insert_with(FeatureFlags::default).enable_lyrics = enabled;
        self
    }

    /// Enables or disables remote artwork lookups.
    ///
    /// Default: true
    pub fn enable_artwork_remote(mut self, enabled: bool) -> Self {
        self.features
            .get_or_insert_with(FeatureFlags::default)
            .enable_artwork_remote = enabled;
        self
    }

    /// Sets all feature flags at once.
    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = Some(features);
        self
    }

    /// Sets the remote provider configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_runtime::config::{CoreConfig, ProviderConfig};
    ///
    /// let builder = CoreConfig::builder()
    ///     .provider(ProviderConfig::new("http://127.0.0.1:3000"));
    /// ```
    pub fn provider(mut self, provider: ProviderConfig) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Returns
    ///
    /// Returns `Ok(CoreConfig)` on success, or an error if:
    /// - The app data directory or file system bridge is missing and no
    ///   platform default exists
    /// - Configuration values are invalid
    /// - Feature flags are inconsistent with available bridges
    pub fn build(self) -> Result<CoreConfig> {
        let app_data_dir = match self.app_data_dir {
            Some(dir) => dir,
            None => provide_default_app_data_dir()?,
        };

        let file_system = match self.file_system {
            Some(fs) => fs,
            None => provide_default_file_system()?,
        };

        let remote_timeout = self.remote_timeout.unwrap_or(DEFAULT_REMOTE_TIMEOUT);
        let features = self.features.unwrap_or_default();

        let http_client = match self.http_client {
            Some(client) => Some(client),
            None if features.any_remote() => provide_default_http_client(remote_timeout),
            None => None,
        };

        let config = CoreConfig {
            app_data_dir,
            audio_extensions: self.audio_extensions.unwrap_or_else(|| {
                DEFAULT_AUDIO_EXTENSIONS
                    .iter()
                    .map(|ext| ext.to_string())
                    .collect()
            }),
            scan_max_depth: self.scan_max_depth.unwrap_or(DEFAULT_SCAN_MAX_DEPTH),
            follow_symlinks: self.follow_symlinks.unwrap_or(true),
            remote_timeout,
            index_concurrency: self.index_concurrency.unwrap_or(DEFAULT_INDEX_CONCURRENCY),
            http_client,
            file_system,
            features,
            provider: self.provider.unwrap_or_default(),
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::{BridgeError, HttpRequest, HttpResponse};
    use bytes::Bytes;
    use std::path::Path;

    struct NullFileSystem;

    #[async_trait]
    impl FileSystemAccess for NullFileSystem {
        async fn exists(&self, _path: &Path) -> std::result::Result<bool, BridgeError> {
            Ok(false)
        }

        async fn create_dir_all(&self, _path: &Path) -> std::result::Result<(), BridgeError> {
            Ok(())
        }

        async fn read_file(&self, _path: &Path) -> std::result::Result<Bytes, BridgeError> {
            Err(BridgeError::NotAvailable("null".to_string()))
        }

        async fn write_file(
            &self,
            _path: &Path,
            _data: Bytes,
        ) -> std::result::Result<(), BridgeError> {
            Ok(())
        }

        async fn rename(&self, _from: &Path, _to: &Path) -> std::result::Result<(), BridgeError> {
            Ok(())
        }

        async fn delete_file(&self, _path: &Path) -> std::result::Result<(), BridgeError> {
            Ok(())
        }
    }

    struct NullHttpClient;

    #[async_trait]
    impl HttpClient for NullHttpClient {
        async fn execute(
            &self,
            _request: HttpRequest,
        ) -> std::result::Result<HttpResponse, BridgeError> {
            Err(BridgeError::NotAvailable("null".to_string()))
        }
    }

    fn base_builder() -> CoreConfigBuilder {
        CoreConfig::builder()
            .app_data_dir("/data/app")
            .file_system(Arc::new(NullFileSystem))
            .http_client(Arc::new(NullHttpClient))
    }

    #[test]
    fn test_build_applies_defaults() {
        let config = base_builder().build().unwrap();

        assert_eq!(config.scan_max_depth, 64);
        assert!(config.follow_symlinks);
        assert_eq!(config.remote_timeout, Duration::from_secs(10));
        assert_eq!(config.index_concurrency, 8);
        assert_eq!(config.audio_extensions.len(), DEFAULT_AUDIO_EXTENSIONS.len());
        assert!(config.features.enable_lyrics);
        assert!(config.features.enable_artwork_remote);
        assert_eq!(config.provider, ProviderConfig::default());
    }

    #[test]
    fn test_derived_cache_directories() {
        let config = base_builder().build().unwrap();

        assert_eq!(
            config.library_cache_dir(),
            PathBuf::from("/data/app").join("MusicLibrary")
        );
        assert_eq!(
            config.art_cache_dir(),
            PathBuf::from("/data/app").join("AlbumCover")
        );
    }

    #[test]
    fn test_audio_extensions_are_lowercased() {
        let config = base_builder()
            .audio_extensions(["MP3", "Flac"])
            .build()
            .unwrap();

        assert_eq!(config.audio_extensions, vec!["mp3", "flac"]);
    }

    #[test]
    fn test_dotted_extension_rejected() {
        let err = base_builder()
            .audio_extensions([".mp3"])
            .build()
            .unwrap_err();

        assert!(err.to_string().contains("'.mp3' is invalid"));
    }

    #[test]
    fn test_empty_extension_list_rejected() {
        let err = base_builder()
            .audio_extensions(Vec::<String>::new())
            .build()
            .unwrap_err();

        assert!(err.to_string().contains("At least one audio extension"));
    }

    #[test]
    fn test_zero_limits_rejected() {
        assert!(base_builder().scan_max_depth(0).build().is_err());
        assert!(base_builder().index_concurrency(0).build().is_err());
        assert!(base_builder()
            .remote_timeout(Duration::ZERO)
            .build()
            .is_err());
    }

    #[test]
    fn test_remote_features_require_http_client() {
        let result = CoreConfig::builder()
            .app_data_dir("/data/app")
            .file_system(Arc::new(NullFileSystem))
            .features(FeatureFlags::default())
            .build();

        // With desktop shims a default client is injected.
        if cfg!(feature = "desktop-shims") {
            assert!(result.is_ok());
        } else {
            let err = result.unwrap_err().to_string();
            assert!(err.contains("no HttpClient provided"));
        }
    }

    #[test]
    fn test_offline_features_need_no_http_client() {
        let config = CoreConfig::builder()
            .app_data_dir("/data/app")
            .file_system(Arc::new(NullFileSystem))
            .features(FeatureFlags::offline())
            .build()
            .unwrap();

        assert!(config.http_client.is_none());
        assert!(!config.features.any_remote());
    }

    #[test]
    fn test_provider_base_url_validation() {
        assert_eq!(
            ProviderConfig::new("http://localhost:3000/").base_url,
            "http://localhost:3000"
        );

        let err = base_builder()
            .provider(ProviderConfig::new("ftp://example.com"))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("http:// or https://"));
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_builder_requires_file_system() {
        let err = CoreConfig::builder()
            .app_data_dir("/data/app")
            .features(FeatureFlags::offline())
            .build()
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("FileSystemAccess"));
        assert!(message.contains("library caches"));
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_builder_requires_app_data_dir() {
        let err = CoreConfig::builder()
            .file_system(Arc::new(NullFileSystem))
            .features(FeatureFlags::offline())
            .build()
            .unwrap_err();

        assert!(err.to_string().contains("App data directory is required"));
    }

    #[cfg(feature = "desktop-shims")]
    #[test]
    fn test_build_with_desktop_defaults() {
        let config = CoreConfig::builder().build().unwrap();

        assert!(config.app_data_dir.ends_with("media-library-core"));
        assert!(config.http_client.is_some());
    }

    #[test]
    fn test_debug_hides_bridges() {
        let config = base_builder().build().unwrap();
        let rendered = format!("{:?}", config);

        assert!(rendered.contains("HttpClient { ... }"));
        assert!(rendered.contains("FileSystemAccess { ... }"));
    }
}
