use thiserror::Error;

/// Why a refresh exchange did not produce a new token.
///
/// `Clone` so one outcome can be handed to every caller waiting on the same
/// in-flight refresh.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Token refresh failed: {reason}")]
pub struct RefreshError {
    pub reason: String,
}

impl RefreshError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Stored session record is corrupt: {0}")]
    StoreCorrupt(String),

    #[error("Session storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Session expired: {reason}")]
    SessionExpired { reason: String },

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Invalid login callback: {0}")]
    InvalidCallback(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),
}

/// A failed refresh is terminal for the session.
impl From<RefreshError> for AuthError {
    fn from(error: RefreshError) -> Self {
        AuthError::SessionExpired {
            reason: error.reason,
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
