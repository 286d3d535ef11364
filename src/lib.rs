//! Workspace placeholder crate.
//!
//! Re-exports the `core-service` façade behind the `desktop-shims` feature so a
//! host application can depend on a single crate and get the library listing
//! and track metadata operations wired to the desktop bridges.

#[cfg(feature = "desktop-shims")]
pub use core_service::*;
