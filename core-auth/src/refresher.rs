//! Token Refresh Exchange
//!
//! Trades a refresh token for a fresh access token at the login backend's
//! refresh endpoint.
//!
//! # Protocol
//!
//! ```text
//! POST {refresh_url}
//! Content-Type: application/x-www-form-urlencoded
//!
//! refresh_token=AQC...
//!
//! 200 OK
//! {"access_token":"BQD...","expires_in":3600,"refresh_token":"AQC..."}
//! ```
//!
//! `expires_in` defaults to 3600 when absent. A response without a
//! `refresh_token` keeps the one already held.
//!
//! # Retry policy
//!
//! None. A refresh is attempted exactly once per call; every failure is
//! reported as a [`RefreshError`] and nothing is mutated here. Deduplication
//! of concurrent callers happens in [`SessionManager`](crate::SessionManager).

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use bridge_traits::time::Clock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::RefreshError;
use crate::types::Token;

/// Lifetime assumed when the refresh response omits `expires_in`.
pub const DEFAULT_REFRESHED_EXPIRES_IN: i64 = 3600;

/// Exchanges a token for a fresh one.
#[async_trait]
pub trait Refresher: Send + Sync {
    async fn refresh(&self, token: &Token) -> Result<Token, RefreshError>;
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
    #[serde(default)]
    refresh_token: Option<String>,
}

fn default_expires_in() -> i64 {
    DEFAULT_REFRESHED_EXPIRES_IN
}

/// [`Refresher`] talking to the login backend over the [`HttpClient`] bridge.
pub struct HttpTokenRefresher {
    http_client: Arc<dyn HttpClient>,
    refresh_url: String,
    clock: Arc<dyn Clock>,
    timeout: Option<Duration>,
}

impl HttpTokenRefresher {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        refresh_url: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            http_client,
            refresh_url: refresh_url.into(),
            clock,
            timeout: None,
        }
    }

    /// Per-request timeout handed to the HTTP client.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn refresh_url(&self) -> &str {
        &self.refresh_url
    }
}

#[async_trait]
impl Refresher for HttpTokenRefresher {
    #[instrument(skip(self, token), fields(url = %self.refresh_url))]
    async fn refresh(&self, token: &Token) -> Result<Token, RefreshError> {
        let refresh_token = token
            .refresh_token
            .as_deref()
            .ok_or_else(|| RefreshError::new("no refresh token available"))?;

        let mut request = HttpRequest::new(HttpMethod::Post, self.refresh_url.clone())
            .header("Accept", "application/json")
            .form(&RefreshRequest { refresh_token })
            .map_err(|e| RefreshError::new(format!("failed to encode refresh request: {}", e)))?;
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        debug!("Requesting token refresh");

        let response = self.http_client.execute(request).await.map_err(|e| {
            warn!(error = %e, "Refresh request failed");
            RefreshError::new(format!("refresh request failed: {}", e))
        })?;

        if !response.is_success() {
            let status = response.status;
            let body = response
                .text()
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            warn!(status, "Refresh endpoint rejected the request");
            return Err(RefreshError::new(format!(
                "refresh endpoint returned {}: {}",
                status,
                body.trim()
            )));
        }

        let parsed: TokenResponse = response
            .json()
            .map_err(|e| RefreshError::new(format!("malformed refresh response: {}", e)))?;

        if parsed.access_token.trim().is_empty() {
            return Err(RefreshError::new(
                "malformed refresh response: empty access_token",
            ));
        }
        if parsed.expires_in <= 0 {
            return Err(RefreshError::new(format!(
                "malformed refresh response: expires_in {}",
                parsed.expires_in
            )));
        }

        let rotated = parsed
            .refresh_token
            .as_deref()
            .is_some_and(|t| !t.is_empty());
        info!(
            expires_in = parsed.expires_in,
            rotated, "Access token refreshed"
        );

        let next_refresh = match parsed.refresh_token.filter(|t| !t.is_empty()) {
            Some(issued) => Some(issued),
            None => token.refresh_token.clone(),
        };

        Ok(Token::new(
            parsed.access_token,
            self.clock.now(),
            parsed.expires_in,
            next_refresh,
        ))
    }
}
