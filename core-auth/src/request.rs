//! Authorized Web API requests.
//!
//! [`AuthorizedClient`] decorates the [`HttpClient`] bridge: every call gets
//! a valid access token from the [`SessionManager`] as a bearer credential.
//! A `401` triggers exactly one forced refresh and one retry; a second `401`
//! ends the session.

use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::error::AuthError;
use crate::session::SessionManager;

/// Errors from an authorized API call.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The API rejected a freshly refreshed token; the session was logged out.
    #[error("Unauthorized: the API rejected the refreshed access token")]
    Unauthorized,

    #[error("API returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error(transparent)]
    Session(#[from] AuthError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// An API operation relative to the configured base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub method: HttpMethod,
    /// Path below the API base, e.g. `/me/top/artists`
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl Endpoint {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

/// Spotify's error envelope: `{"error": {"status": 404, "message": "..."}}`.
#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn error_message(response: &HttpResponse) -> String {
    if let Ok(envelope) = response.json::<ErrorEnvelope>() {
        return envelope.error.message;
    }

    match response.text() {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        _ => format!("HTTP {}", response.status),
    }
}

/// Sends API requests on behalf of the current session.
pub struct AuthorizedClient {
    session: Arc<SessionManager>,
    http_client: Arc<dyn HttpClient>,
    base_url: Url,
    timeout: Option<Duration>,
}

impl AuthorizedClient {
    pub fn new(
        session: Arc<SessionManager>,
        http_client: Arc<dyn HttpClient>,
        base_url: Url,
    ) -> Self {
        Self {
            session,
            http_client,
            base_url,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL for `endpoint`.
    pub fn resolve(&self, endpoint: &Endpoint) -> ApiResult<Url> {
        let joined = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            endpoint.path.trim_start_matches('/')
        );
        let mut url = Url::parse(&joined)
            .map_err(|e| ApiError::InvalidRequest(format!("bad endpoint '{}': {}", endpoint.path, e)))?;

        if !endpoint.query.is_empty() {
            url.query_pairs_mut().extend_pairs(endpoint.query.iter());
        }

        Ok(url)
    }

    async fn send(&self, endpoint: &Endpoint, url: &Url, access_token: &str) -> ApiResult<HttpResponse> {
        let mut request = HttpRequest::new(endpoint.method, url.as_str())
            .header("Accept", "application/json")
            .bearer_token(access_token);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        self.http_client
            .execute(request)
            .await
            .map_err(|e| ApiError::Network(e.to_string()))
    }

    fn check(response: HttpResponse) -> ApiResult<HttpResponse> {
        if response.is_success() {
            return Ok(response);
        }

        let message = error_message(&response);
        warn!(status = response.status, message = %message, "API request failed");
        Err(ApiError::Status {
            status: response.status,
            message,
        })
    }

    /// Performs `endpoint` with the session's token.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Session`] when no valid token can be obtained
    /// - [`ApiError::Unauthorized`] when the retried call is rejected again;
    ///   the session is logged out
    /// - [`ApiError::Status`] for any other non-2xx response
    /// - [`ApiError::Network`] when the request could not be sent
    #[instrument(skip(self, endpoint), fields(method = endpoint.method.as_str(), path = %endpoint.path))]
    pub async fn call(&self, endpoint: &Endpoint) -> ApiResult<HttpResponse> {
        let url = self.resolve(endpoint)?;

        let token = self.session.get_valid_token().await?;
        let response = self.send(endpoint, &url, &token).await?;
        if !response.is_unauthorized() {
            debug!(status = response.status, "API response");
            return Self::check(response);
        }

        info!("API rejected access token, refreshing once");
        let token = self.session.force_refresh(&token).await?;
        let response = self.send(endpoint, &url, &token).await?;

        if response.is_unauthorized() {
            warn!("API rejected the refreshed token, logging out");
            if let Err(e) = self.session.logout().await {
                warn!(error = %e, "Logout after rejected token did not complete cleanly");
            }
            return Err(ApiError::Unauthorized);
        }

        Self::check(response)
    }

    /// [`call`](Self::call), decoding a JSON body into `T`.
    pub async fn call_json<T: DeserializeOwned>(&self, endpoint: &Endpoint) -> ApiResult<T> {
        let response = self.call(endpoint).await?;
        response
            .json()
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}
