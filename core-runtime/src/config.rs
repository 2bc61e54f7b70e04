//! # Session Configuration
//!
//! Endpoints and tuning knobs for the session core, built with a fail-fast
//! builder.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::config::SessionConfig;
//!
//! let config = SessionConfig::builder()
//!     .login_url("https://profile.example.com/login")
//!     .refresh_url("https://profile.example.com/refresh_token")
//!     .refresh_skew_secs(120)
//!     .build()
//!     .expect("valid config");
//!
//! assert_eq!(config.refresh_skew_secs, 120);
//! ```
//!
//! ## Environment
//!
//! [`SessionConfigBuilder::from_env`] seeds the builder from:
//!
//! | variable | field |
//! |----------|-------|
//! | `SPOTIFY_LOGIN_URL` | `login_url` |
//! | `SPOTIFY_REFRESH_URL` | `refresh_url` |
//! | `SPOTIFY_API_BASE_URL` | `api_base_url` |
//! | `SPOTIFY_SESSION_KEY` | `storage_key` |
//! | `SPOTIFY_REFRESH_SKEW_SECS` | `refresh_skew_secs` |
//!
//! ## Error Handling
//!
//! `build()` returns [`Error::Config`] with a message naming the offending
//! setting:
//!
//! ```should_panic
//! use core_runtime::config::SessionConfig;
//!
//! SessionConfig::builder()
//!     .refresh_url("not a url")
//!     .build()
//!     .expect("Should fail - refresh URL is not absolute");
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use std::time::Duration;
use url::Url;

pub const DEFAULT_LOGIN_URL: &str = "http://localhost:8888/login";
pub const DEFAULT_REFRESH_URL: &str = "http://localhost:8888/refresh_token";
pub const DEFAULT_API_BASE_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_STORAGE_KEY: &str = "spotify_session";
/// Seconds before expiry at which a token is treated as stale.
pub const DEFAULT_REFRESH_SKEW_SECS: i64 = 60;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on the skew. Spotify access tokens live for one hour; a skew
/// close to that would refresh on nearly every read.
pub const MAX_REFRESH_SKEW_SECS: i64 = 600;

pub const ENV_LOGIN_URL: &str = "SPOTIFY_LOGIN_URL";
pub const ENV_REFRESH_URL: &str = "SPOTIFY_REFRESH_URL";
pub const ENV_API_BASE_URL: &str = "SPOTIFY_API_BASE_URL";
pub const ENV_SESSION_KEY: &str = "SPOTIFY_SESSION_KEY";
pub const ENV_REFRESH_SKEW_SECS: &str = "SPOTIFY_REFRESH_SKEW_SECS";

/// Validated session core settings. Use [`SessionConfig::builder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Where `login()` sends the user
    pub login_url: Url,
    /// Refresh exchange endpoint (POST, form body)
    pub refresh_url: Url,
    /// Web API base; endpoint paths are appended to it
    pub api_base_url: Url,
    /// Session storage key holding the persisted token record
    pub storage_key: String,
    pub refresh_skew_secs: i64,
    /// Timeout applied to the refresh exchange and every API call
    pub request_timeout: Duration,
    pub event_buffer_size: usize,
}

impl SessionConfig {
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::default()
    }

    /// Re-check invariants, e.g. after fields were edited by hand.
    pub fn validate(&self) -> Result<()> {
        for (name, url) in [
            ("login URL", &self.login_url),
            ("refresh URL", &self.refresh_url),
            ("API base URL", &self.api_base_url),
        ] {
            check_http_scheme(name, url)?;
        }

        if self.storage_key.trim().is_empty() {
            return Err(Error::Config(
                "Storage key cannot be empty. Use .storage_key() to set it.".to_string(),
            ));
        }

        if !(0..=MAX_REFRESH_SKEW_SECS).contains(&self.refresh_skew_secs) {
            return Err(Error::Config(format!(
                "Refresh skew must be between 0 and {} seconds, got {}",
                MAX_REFRESH_SKEW_SECS, self.refresh_skew_secs
            )));
        }

        if self.request_timeout.is_zero() {
            return Err(Error::Config(
                "Request timeout must be greater than zero".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

fn check_http_scheme(name: &str, url: &Url) -> Result<()> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::Config(format!(
            "The {} must use http or https, got scheme '{}'",
            name, other
        ))),
    }
}

fn parse_url(name: &str, raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| Error::Config(format!("Invalid {} '{}': {}", name, raw, e)))?;
    check_http_scheme(name, &url)?;
    Ok(url)
}

/// Builder for [`SessionConfig`]. Unset fields fall back to the defaults.
#[derive(Debug, Default, Clone)]
pub struct SessionConfigBuilder {
    login_url: Option<String>,
    refresh_url: Option<String>,
    api_base_url: Option<String>,
    storage_key: Option<String>,
    refresh_skew_secs: Option<i64>,
    request_timeout: Option<Duration>,
    event_buffer_size: Option<usize>,
    // Reported by build()
    env_error: Option<String>,
}

impl SessionConfigBuilder {
    /// Builder seeded from the `SPOTIFY_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builder seeded from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::default();
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        builder.login_url = non_empty(ENV_LOGIN_URL);
        builder.refresh_url = non_empty(ENV_REFRESH_URL);
        builder.api_base_url = non_empty(ENV_API_BASE_URL);
        builder.storage_key = non_empty(ENV_SESSION_KEY);

        if let Some(raw) = non_empty(ENV_REFRESH_SKEW_SECS) {
            match raw.trim().parse::<i64>() {
                Ok(secs) => builder.refresh_skew_secs = Some(secs),
                Err(_) => {
                    builder.env_error = Some(format!(
                        "{} must be an integer number of seconds, got '{}'",
                        ENV_REFRESH_SKEW_SECS, raw
                    ))
                }
            }
        }

        builder
    }

    pub fn login_url(mut self, url: impl Into<String>) -> Self {
        self.login_url = Some(url.into());
        self
    }

    pub fn refresh_url(mut self, url: impl Into<String>) -> Self {
        self.refresh_url = Some(url.into());
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    pub fn storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = Some(key.into());
        self
    }

    pub fn refresh_skew_secs(mut self, secs: i64) -> Self {
        self.refresh_skew_secs = Some(secs);
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when a URL does not parse or is not
    /// http(s), the storage key is blank, the skew is out of range, or a
    /// `SPOTIFY_*` variable could not be interpreted.
    pub fn build(self) -> Result<SessionConfig> {
        if let Some(message) = self.env_error {
            return Err(Error::Config(message));
        }

        let config = SessionConfig {
            login_url: parse_url(
                "login URL",
                self.login_url.as_deref().unwrap_or(DEFAULT_LOGIN_URL),
            )?,
            refresh_url: parse_url(
                "refresh URL",
                self.refresh_url.as_deref().unwrap_or(DEFAULT_REFRESH_URL),
            )?,
            api_base_url: parse_url(
                "API base URL",
                self.api_base_url.as_deref().unwrap_or(DEFAULT_API_BASE_URL),
            )?,
            storage_key: self
                .storage_key
                .unwrap_or_else(|| DEFAULT_STORAGE_KEY.to_string()),
            refresh_skew_secs: self.refresh_skew_secs.unwrap_or(DEFAULT_REFRESH_SKEW_SECS),
            request_timeout: self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = SessionConfig::builder().build().unwrap();
        assert_eq!(config.login_url.as_str(), "http://localhost:8888/login");
        assert_eq!(
            config.refresh_url.as_str(),
            "http://localhost:8888/refresh_token"
        );
        assert_eq!(config.api_base_url.as_str(), "https://api.spotify.com/v1");
        assert_eq!(config.storage_key, "spotify_session");
        assert_eq!(config.refresh_skew_secs, 60);
        assert_eq!(config.event_buffer_size, DEFAULT_EVENT_BUFFER_SIZE);
        assert_eq!(config.request_timeout, DEFAULT_REQUEST_TIMEOUT);
    }

    #[test]
    fn test_rejects_invalid_urls() {
        let err = SessionConfig::builder()
            .login_url("localhost:8888/login")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("login URL")));

        let err = SessionConfig::builder()
            .api_base_url("ftp://api.spotify.com/v1")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("http or https")));
    }

    #[test]
    fn test_rejects_bad_tuning() {
        assert!(SessionConfig::builder().storage_key("  ").build().is_err());
        assert!(SessionConfig::builder().refresh_skew_secs(-1).build().is_err());
        assert!(SessionConfig::builder()
            .refresh_skew_secs(MAX_REFRESH_SKEW_SECS + 1)
            .build()
            .is_err());
        assert!(SessionConfig::builder()
            .request_timeout(Duration::ZERO)
            .build()
            .is_err());
        assert!(SessionConfig::builder().event_buffer_size(0).build().is_err());

        // Zero skew is allowed: refresh exactly at expiry
        assert!(SessionConfig::builder().refresh_skew_secs(0).build().is_ok());
        assert!(SessionConfig::builder()
            .refresh_skew_secs(MAX_REFRESH_SKEW_SECS)
            .build()
            .is_ok());
    }

    #[test]
    fn test_rejects_skew_as_long_as_token_lifetime() {
        let err = SessionConfig::builder()
            .refresh_skew_secs(3600)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("600")));
    }

    #[test]
    fn test_from_lookup_overrides_defaults() {
        let config = SessionConfigBuilder::from_lookup(lookup(&[
            (ENV_LOGIN_URL, "https://profile.example.com/login"),
            (ENV_REFRESH_URL, "https://profile.example.com/refresh_token"),
            (ENV_SESSION_KEY, "profile_session"),
            (ENV_REFRESH_SKEW_SECS, " 90 "),
            (ENV_API_BASE_URL, ""),
        ]))
        .build()
        .unwrap();

        assert_eq!(config.login_url.as_str(), "https://profile.example.com/login");
        assert_eq!(config.storage_key, "profile_session");
        assert_eq!(config.refresh_skew_secs, 90);
        // Blank variables are ignored
        assert_eq!(config.api_base_url.as_str(), "https://api.spotify.com/v1");
    }

    #[test]
    fn test_from_lookup_then_explicit_setter_wins() {
        let config = SessionConfigBuilder::from_lookup(lookup(&[(ENV_SESSION_KEY, "from_env")]))
            .storage_key("explicit")
            .build()
            .unwrap();
        assert_eq!(config.storage_key, "explicit");
    }

    #[test]
    fn test_from_lookup_reports_bad_skew() {
        let err = SessionConfigBuilder::from_lookup(lookup(&[(ENV_REFRESH_SKEW_SECS, "soon")]))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains(ENV_REFRESH_SKEW_SECS)));
    }
}
