//! # Session Core
//!
//! Token lifecycle for the Spotify profile client.
//!
//! ## Overview
//!
//! The client talks to the Spotify Web API with a short-lived access token
//! obtained through a login backend. This crate keeps that token usable:
//!
//! - [`TokenStore`] persists the token across reloads
//! - [`expiry`] decides when a token is due for refresh
//! - [`Refresher`] / [`HttpTokenRefresher`] exchange the refresh token
//! - [`SessionManager`] owns the session state machine, deduplicates
//!   concurrent refreshes and handles login, callback consumption and logout
//! - [`AuthorizedClient`] injects the token into API calls and retries once
//!   when the API rejects it

pub mod callback;
pub mod error;
pub mod expiry;
pub mod refresher;
pub mod request;
pub mod session;
pub mod token_store;
pub mod types;

pub use callback::{parse_callback, strip_callback_params, CallbackOutcome};
pub use error::{AuthError, RefreshError, Result};
pub use expiry::{
    effective_skew, needs_refresh, refresh_due_at, remaining_seconds, DEFAULT_REFRESH_SKEW,
};
pub use refresher::{HttpTokenRefresher, Refresher};
pub use request::{ApiError, ApiResult, AuthorizedClient, Endpoint};
pub use session::SessionManager;
pub use token_store::TokenStore;
pub use types::{Session, SessionId, SessionState, Token};
