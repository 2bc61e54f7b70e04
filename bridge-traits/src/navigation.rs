//! Navigation Abstraction
//!
//! Gives the session core access to the host's current location so it can
//! consume login callback parameters and send the user to the login entry.

use crate::error::Result;

/// Host navigation capability
///
/// - Desktop: an in-memory location updated by the embedding shell
/// - Web: `window.location` plus `history.replaceState`
pub trait Navigator: Send + Sync {
    /// The full URL currently shown to the user
    fn current_url(&self) -> Result<String>;

    /// Replace the visible URL without navigating (no new history entry)
    fn replace_url(&self, url: &str) -> Result<()>;

    /// Navigate away to `url`
    fn redirect(&self, url: &str) -> Result<()>;
}
