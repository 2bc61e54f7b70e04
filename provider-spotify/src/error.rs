//! Error types for the Spotify provider

use core_auth::{ApiError, AuthError};
use thiserror::Error;

/// Spotify provider errors
#[derive(Error, Debug)]
pub enum SpotifyError {
    /// The authorized request failed (session, transport or API status)
    #[error(transparent)]
    Api(#[from] ApiError),

    /// An identifier cannot be placed in a request path
    #[error("Invalid Spotify ID: {0:?}")]
    InvalidId(String),

    /// Playlist not found or not visible to the user
    #[error("Playlist not found: {playlist_id}")]
    PlaylistNotFound { playlist_id: String },
}

/// Result type for Spotify operations
pub type Result<T> = std::result::Result<T, SpotifyError>;

impl SpotifyError {
    /// `true` when the failure means the user has to log in again.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            SpotifyError::Api(ApiError::Unauthorized)
                | SpotifyError::Api(ApiError::Session(
                    AuthError::NotAuthenticated | AuthError::SessionExpired { .. }
                ))
        )
    }
}
