//! Workspace entry crate.
//!
//! This crate exposes feature flags that map to the individual workspace
//! crates (`core-service`, `core-auth`, `provider-spotify`). Host applications
//! can depend on `spotify-profile-workspace` and enable the documented features
//! without needing to wire each crate individually.

#[cfg(feature = "desktop-shims")]
pub use core_service::*;

#[cfg(all(feature = "session-only", not(feature = "desktop-shims")))]
pub use core_auth;
#[cfg(all(feature = "session-only", not(feature = "desktop-shims")))]
pub use provider_spotify;
