//! Durable Token Storage
//!
//! Persists the session [`Token`] through the host's
//! [`SessionStorage`](bridge_traits::storage::SessionStorage) so a session
//! survives reloads.
//!
//! ## Record format
//!
//! One JSON object under a single key (default `spotify_session`):
//!
//! ```json
//! {"access_token":"BQD...","issued_at":1700000000,"expires_in":3600,"refresh_token":"AQC..."}
//! ```
//!
//! ## Failure policy
//!
//! Loading fails closed: a missing, unreadable or malformed record yields
//! `None` so boot continues unauthenticated. Malformed records are removed.
//! Write failures are reported as [`AuthError::StorageUnavailable`].
//!
//! ## Example
//!
//! ```no_run
//! use core_auth::{Token, TokenStore};
//! use std::sync::Arc;
//! # use bridge_traits::storage::SessionStorage;
//! # async fn example(storage: Arc<dyn SessionStorage>) -> core_auth::Result<()> {
//! let store = TokenStore::new(storage, "spotify_session");
//!
//! let token = Token::new("BQD...", chrono::Utc::now(), 3600, Some("AQC...".to_string()));
//! store.save(&token).await?;
//!
//! assert!(store.load().await.is_some());
//!
//! store.clear().await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::types::Token;
use bridge_traits::storage::SessionStorage;
use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Persistence for the single session token.
///
/// Token values are never logged.
#[derive(Clone)]
pub struct TokenStore {
    storage: Arc<dyn SessionStorage>,
    key: String,
}

/// On-disk shape of a [`Token`].
#[derive(Debug, Serialize, Deserialize)]
struct StoredToken {
    access_token: String,
    /// Unix seconds
    issued_at: i64,
    expires_in: i64,
    #[serde(default)]
    refresh_token: Option<String>,
}

impl From<&Token> for StoredToken {
    fn from(token: &Token) -> Self {
        Self {
            access_token: token.access_token.clone(),
            issued_at: token.issued_at.timestamp(),
            expires_in: token.expires_in,
            refresh_token: token.refresh_token.clone(),
        }
    }
}

impl StoredToken {
    fn into_token(self) -> Result<Token> {
        if self.access_token.trim().is_empty() {
            return Err(AuthError::StoreCorrupt("empty access token".to_string()));
        }

        if self.expires_in <= 0 {
            return Err(AuthError::StoreCorrupt(format!(
                "non-positive expiry {}",
                self.expires_in
            )));
        }

        let issued_at = Utc
            .timestamp_opt(self.issued_at, 0)
            .single()
            .ok_or_else(|| {
                AuthError::StoreCorrupt(format!("issue instant {} out of range", self.issued_at))
            })?;

        Ok(Token::new(
            self.access_token,
            issued_at,
            self.expires_in,
            self.refresh_token,
        ))
    }
}

impl TokenStore {
    pub fn new(storage: Arc<dyn SessionStorage>, key: impl Into<String>) -> Self {
        let key = key.into();
        debug!(key = %key, "Initializing TokenStore");
        Self { storage, key }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Decode a raw record, rejecting anything that is not a well-formed token.
    fn decode(raw: &str) -> Result<Token> {
        let stored: StoredToken =
            serde_json::from_str(raw).map_err(|e| AuthError::StoreCorrupt(e.to_string()))?;
        stored.into_token()
    }

    /// Load the persisted token.
    ///
    /// Returns `None` when nothing is stored, the backend cannot be read, or
    /// the record is malformed. Malformed records are removed best-effort.
    pub async fn load(&self) -> Option<Token> {
        let raw = match self.storage.get(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key = %self.key, "No stored session");
                return None;
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "Session storage unreadable, starting without a session");
                return None;
            }
        };

        match Self::decode(&raw) {
            Ok(token) => {
                info!(
                    key = %self.key,
                    issued_at = token.issued_at.timestamp(),
                    expires_in = token.expires_in,
                    has_refresh_token = token.has_refresh_token(),
                    "Stored session loaded"
                );
                Some(token)
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "Discarding corrupt session record");

                if let Err(remove_err) = self.storage.remove(&self.key).await {
                    warn!(
                        key = %self.key,
                        error = %remove_err,
                        "Failed to remove corrupt session record"
                    );
                }

                None
            }
        }
    }

    /// Persist `token`, replacing any previous record.
    pub async fn save(&self, token: &Token) -> Result<()> {
        let json = serde_json::to_string(&StoredToken::from(token))
            .map_err(|e| AuthError::StorageUnavailable(format!("encode failed: {}", e)))?;

        self.storage.set(&self.key, &json).await.map_err(|e| {
            warn!(key = %self.key, error = %e, "Failed to persist session");
            AuthError::StorageUnavailable(e.to_string())
        })?;

        debug!(
            key = %self.key,
            expires_in = token.expires_in,
            has_refresh_token = token.has_refresh_token(),
            "Session persisted"
        );
        Ok(())
    }

    /// Remove the persisted record. Succeeds when nothing is stored.
    pub async fn clear(&self) -> Result<()> {
        self.storage.remove(&self.key).await.map_err(|e| {
            warn!(key = %self.key, error = %e, "Failed to clear session");
            AuthError::StorageUnavailable(e.to_string())
        })?;

        info!(key = %self.key, "Stored session cleared");
        Ok(())
    }
}
