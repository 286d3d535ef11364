//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the media library core:
//! - Logging and tracing infrastructure
//! - Configuration management
//!
//! Other crates in the workspace take a [`config::CoreConfig`] at construction
//! and emit logs through `tracing`; this crate decides where those logs go and
//! which bridges and limits the services run with.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{CoreConfig, FeatureFlags, ProviderConfig};
pub use error::{Error, Result};
