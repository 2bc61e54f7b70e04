//! In-memory Navigator for desktop shells

use bridge_traits::{
    error::{BridgeError, Result},
    navigation::Navigator,
};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

#[derive(Debug, Default)]
struct Location {
    current: String,
    redirects: Vec<String>,
}

/// `Navigator` over an in-memory location.
///
/// The embedding shell sets the location after its webview or OAuth loopback
/// lands on the client URL; redirects are recorded for the shell to act on.
#[derive(Debug, Default)]
pub struct MemoryNavigator {
    location: Mutex<Location>,
}

impl MemoryNavigator {
    pub fn new(initial_url: impl Into<String>) -> Self {
        Self {
            location: Mutex::new(Location {
                current: initial_url.into(),
                redirects: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Location>> {
        self.location
            .lock()
            .map_err(|_| BridgeError::OperationFailed("Navigator state poisoned".to_string()))
    }

    /// Update the current location (e.g. when a login callback arrives)
    pub fn set_location(&self, url: impl Into<String>) -> Result<()> {
        self.lock()?.current = url.into();
        Ok(())
    }

    /// Every redirect requested so far, oldest first
    pub fn redirects(&self) -> Vec<String> {
        self.lock()
            .map(|location| location.redirects.clone())
            .unwrap_or_default()
    }

    /// Most recent redirect target, if any
    pub fn last_redirect(&self) -> Option<String> {
        self.lock()
            .ok()
            .and_then(|location| location.redirects.last().cloned())
    }
}

impl Navigator for MemoryNavigator {
    fn current_url(&self) -> Result<String> {
        Ok(self.lock()?.current.clone())
    }

    fn replace_url(&self, url: &str) -> Result<()> {
        debug!(url, "Replacing visible URL");
        self.lock()?.current = url.to_string();
        Ok(())
    }

    fn redirect(&self, url: &str) -> Result<()> {
        info!(url, "Redirect requested");
        let mut location = self.lock()?;
        location.current = url.to_string();
        location.redirects.push(url.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_does_not_record_redirect() {
        let nav = MemoryNavigator::new("http://localhost:3000/?access_token=abc");
        nav.replace_url("http://localhost:3000/").unwrap();

        assert_eq!(nav.current_url().unwrap(), "http://localhost:3000/");
        assert!(nav.redirects().is_empty());
    }

    #[test]
    fn test_redirect_is_recorded() {
        let nav = MemoryNavigator::new("http://localhost:3000/");
        nav.redirect("http://localhost:8888/login").unwrap();

        assert_eq!(nav.current_url().unwrap(), "http://localhost:8888/login");
        assert_eq!(
            nav.last_redirect().as_deref(),
            Some("http://localhost:8888/login")
        );

        nav.set_location("http://localhost:3000/#access_token=abc").unwrap();
        assert_eq!(
            nav.current_url().unwrap(),
            "http://localhost:3000/#access_token=abc"
        );
        assert_eq!(nav.redirects().len(), 1);
    }
}
