use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier tagging one authenticated session in events and logs.
///
/// A new id is minted whenever a session is established (login callback or
/// restore); refreshing a token keeps the id.
///
/// # Examples
///
/// ```
/// use core_auth::SessionId;
///
/// let id = SessionId::from_string("550e8400-e29b-41d4-a716-446655440000").unwrap();
/// assert_eq!(id.to_string(), "550e8400-e29b-41d4-a716-446655440000");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An access token plus the facts needed to decide when it stops working.
///
/// `issued_at + expires_in` is the only source of truth for expiry. The
/// issue instant is kept at whole-second precision so a token survives a
/// round trip through storage unchanged.
///
/// # Security
///
/// The `Debug` implementation redacts both token values.
///
/// # Examples
///
/// ```
/// use core_auth::Token;
/// use chrono::{TimeZone, Utc};
///
/// let issued = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
/// let token = Token::new("BQD...", issued, 3600, Some("AQC...".to_string()));
///
/// assert_eq!(token.expires_at().timestamp(), 1_700_003_600);
/// assert!(!format!("{:?}", token).contains("BQD"));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    pub access_token: String,
    pub issued_at: DateTime<Utc>,
    /// Lifetime in seconds, counted from `issued_at`
    pub expires_in: i64,
    pub refresh_token: Option<String>,
}

impl Token {
    pub fn new(
        access_token: impl Into<String>,
        issued_at: DateTime<Utc>,
        expires_in: i64,
        refresh_token: Option<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            issued_at: truncate_to_seconds(issued_at),
            expires_in,
            refresh_token: refresh_token.filter(|t| !t.is_empty()),
        }
    }

    /// Instant after which the access token is no longer accepted.
    pub fn expires_at(&self) -> DateTime<Utc> {
        crate::expiry::offset_seconds(self.issued_at, self.expires_in)
    }

    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.is_some()
    }
}

pub(crate) fn truncate_to_seconds(at: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_opt(at.timestamp(), 0).single().unwrap_or(at)
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"[REDACTED]")
            .field("issued_at", &self.issued_at)
            .field("expires_in", &self.expires_in)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Lifecycle state of the session.
///
/// ```text
/// Unauthenticated -> Authenticating -> Authenticated <-> RefreshPending
///        ^                                   |               |
///        +------------ refresh failure ------+---------------+
/// any state -> LoggedOut
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SessionState {
    /// No usable token
    #[default]
    Unauthenticated,
    /// The user was sent to the login entry point
    Authenticating,
    /// A token is held and believed valid
    Authenticated,
    /// A refresh exchange is in flight
    RefreshPending,
    /// The user logged out
    LoggedOut,
}

impl SessionState {
    /// `true` while a token is held (including during a refresh).
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated | SessionState::RefreshPending)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Unauthenticated => write!(f, "Unauthenticated"),
            SessionState::Authenticating => write!(f, "Authenticating..."),
            SessionState::Authenticated => write!(f, "Authenticated"),
            SessionState::RefreshPending => write!(f, "Refreshing Token..."),
            SessionState::LoggedOut => write!(f, "Logged Out"),
        }
    }
}

/// Token-free view of the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    pub state: SessionState,
    pub expires_at: DateTime<Utc>,
    /// When a proactive refresh becomes due under the configured skew
    pub refresh_due_at: DateTime<Utc>,
    pub has_refresh_token: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_session_id_unique_and_parseable() {
        let a = SessionId::new();
        let b = SessionId::new();
        assert_ne!(a, b);
        assert_eq!(SessionId::from_string(&a.to_string()).unwrap(), a);
        assert!(SessionId::from_string("not-a-uuid").is_err());
    }

    #[test]
    fn test_token_new_truncates_and_drops_empty_refresh() {
        let issued = at(1_700_000_000) + chrono::Duration::milliseconds(750);
        let token = Token::new("abc", issued, 3600, Some(String::new()));

        assert_eq!(token.issued_at, at(1_700_000_000));
        assert_eq!(token.refresh_token, None);
        assert!(!token.has_refresh_token());
        assert_eq!(token.expires_at(), at(1_700_003_600));
    }

    #[test]
    fn test_token_debug_redacts_secrets() {
        let token = Token::new("access-secret", at(0), 3600, Some("refresh-secret".into()));
        let debug = format!("{:?}", token);

        assert!(!debug.contains("access-secret"));
        assert!(!debug.contains("refresh-secret"));
        assert!(debug.contains("[REDACTED]"));
        assert!(debug.contains("3600"));
    }

    #[test]
    fn test_session_state() {
        assert_eq!(SessionState::default(), SessionState::Unauthenticated);
        assert!(SessionState::Authenticated.is_authenticated());
        assert!(SessionState::RefreshPending.is_authenticated());
        assert!(!SessionState::Authenticating.is_authenticated());
        assert!(!SessionState::LoggedOut.is_authenticated());
        assert_eq!(SessionState::LoggedOut.to_string(), "Logged Out");
    }
}
