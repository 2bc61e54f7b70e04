//! # Session Manager
//!
//! Single entry point for everything the client needs to know about the
//! user's session: boot, login, "give me a valid token", forced refresh and
//! logout.
//!
//! ## Overview
//!
//! `SessionManager` exclusively owns the in-memory session and mirrors it to
//! the [`TokenStore`]. It composes:
//!
//! - the [`TokenStore`] for persistence across reloads
//! - the [`expiry`](crate::expiry) functions to decide when a token is stale
//! - a [`Refresher`] for the network exchange
//! - the [`Navigator`] bridge for callback URLs and login redirects
//!
//! Every transition is announced on the [`EventBus`].
//!
//! ## Concurrency
//!
//! At most one refresh runs at a time. The first caller that finds the token
//! stale spawns the exchange on the tokio runtime and parks a shared handle
//! to it in the manager's state; every other caller awaits the same handle
//! and observes the same outcome. The spawned task applies the outcome
//! itself, so a caller that is cancelled mid-refresh cannot leave the session
//! stuck in `RefreshPending`. Logout drops the parked attempt and bumps an
//! epoch counter, so an exchange that completes afterwards is discarded
//! instead of resurrecting the session.
//!
//! Refreshing requires a running tokio runtime.
//!
//! ## Usage
//!
//! ```no_run
//! use core_auth::{HttpTokenRefresher, SessionManager, TokenStore};
//! use core_runtime::events::EventBus;
//! use std::sync::Arc;
//! # use bridge_traits::{Clock, HttpClient, Navigator, SessionStorage};
//! # async fn example(
//! #     http: Arc<dyn HttpClient>,
//! #     storage: Arc<dyn SessionStorage>,
//! #     navigator: Arc<dyn Navigator>,
//! #     clock: Arc<dyn Clock>,
//! # ) -> core_auth::Result<()> {
//! let refresher = HttpTokenRefresher::new(http, "http://localhost:8888/refresh_token", clock.clone());
//! let manager = SessionManager::new(
//!     TokenStore::new(storage, "spotify_session"),
//!     Arc::new(refresher),
//!     navigator,
//!     clock,
//!     EventBus::new(100),
//! );
//!
//! manager.initialize().await?;
//! let access_token = manager.get_valid_token().await?;
//! # Ok(())
//! # }
//! ```

use crate::callback::{parse_callback, strip_callback_params, CallbackOutcome};
use crate::error::{AuthError, RefreshError, Result};
use crate::expiry::{effective_skew, needs_refresh, refresh_due_at, DEFAULT_REFRESH_SKEW};
use crate::refresher::{HttpTokenRefresher, Refresher};
use crate::token_store::TokenStore;
use crate::types::{Session, SessionId, SessionState, Token};
use bridge_traits::http::HttpClient;
use bridge_traits::navigation::Navigator;
use bridge_traits::storage::SessionStorage;
use bridge_traits::time::Clock;
use core_runtime::config::{SessionConfig, DEFAULT_LOGIN_URL};
use core_runtime::events::{CoreEvent, EventBus, SessionEvent, SessionSource};
use core_runtime::logging::redact_url_secrets;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn, Instrument, Span};

type SharedRefresh = Shared<BoxFuture<'static, std::result::Result<Token, RefreshError>>>;

/// The session currently believed valid.
struct ActiveSession {
    id: SessionId,
    token: Token,
}

/// The single in-flight refresh exchange.
struct RefreshAttempt {
    attempt: u64,
    future: SharedRefresh,
}

#[derive(Default)]
struct Inner {
    state: SessionState,
    current: Option<ActiveSession>,
    /// Bumped by logout and re-initialization
    epoch: u64,
    attempts: u64,
    in_flight: Option<RefreshAttempt>,
}

/// Handle a caller holds while waiting on a refresh.
struct RefreshTicket {
    future: SharedRefresh,
    epoch: u64,
}

fn publish(event_bus: &EventBus, event: SessionEvent) {
    // No subscribers is fine
    let _ = event_bus.emit(CoreEvent::Session(event));
}

/// One refresh exchange, run as its own task so that its outcome is applied
/// even when every caller waiting on it has gone away.
struct RefreshJob {
    inner: Arc<Mutex<Inner>>,
    store: TokenStore,
    refresher: Arc<dyn Refresher>,
    event_bus: EventBus,
    attempt: u64,
    session_id: SessionId,
}

impl RefreshJob {
    async fn run(self, token: Token) -> std::result::Result<Token, RefreshError> {
        let outcome = self.refresher.refresh(&token).await;
        let mut inner = self.inner.lock().await;

        // Logout and re-initialization drop the attempt
        let still_current = inner
            .in_flight
            .as_ref()
            .is_some_and(|f| f.attempt == self.attempt);
        if !still_current {
            info!(attempt = self.attempt, "Session ended during refresh, discarding outcome");
            return outcome;
        }

        inner.in_flight = None;

        match &outcome {
            Ok(token) => {
                if let Some(active) = inner.current.as_mut() {
                    active.token = token.clone();
                }
                inner.state = SessionState::Authenticated;

                // Under the lock so a later logout's clear wins
                if let Err(e) = self.store.save(token).await {
                    warn!(error = %e, "Refreshed token will not survive a reload");
                }

                publish(
                    &self.event_bus,
                    SessionEvent::Refreshed {
                        session_id: self.session_id.to_string(),
                        expires_at: token.expires_at().timestamp(),
                    },
                );
            }
            Err(e) => {
                warn!(reason = %e.reason, "Refresh failed, discarding session");
                inner.current = None;
                inner.state = SessionState::Unauthenticated;

                if let Err(clear_err) = self.store.clear().await {
                    warn!(error = %clear_err, "Failed to clear expired session");
                }

                publish(
                    &self.event_bus,
                    SessionEvent::Expired {
                        session_id: self.session_id.to_string(),
                        reason: e.reason.clone(),
                    },
                );
            }
        }

        outcome
    }
}

/// Owner of the session lifecycle.
///
/// Share it behind an `Arc`; every method takes `&self`.
pub struct SessionManager {
    store: TokenStore,
    refresher: Arc<dyn Refresher>,
    navigator: Arc<dyn Navigator>,
    clock: Arc<dyn Clock>,
    event_bus: EventBus,
    login_url: String,
    skew_secs: i64,
    inner: Arc<Mutex<Inner>>,
}

impl SessionManager {
    /// Creates a manager with the default login URL and refresh skew.
    ///
    /// The session starts `Unauthenticated`; call [`initialize`](Self::initialize)
    /// once at boot.
    pub fn new(
        store: TokenStore,
        refresher: Arc<dyn Refresher>,
        navigator: Arc<dyn Navigator>,
        clock: Arc<dyn Clock>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            store,
            refresher,
            navigator,
            clock,
            event_bus,
            login_url: DEFAULT_LOGIN_URL.to_string(),
            skew_secs: DEFAULT_REFRESH_SKEW,
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// Wires the HTTP refresher and token store described by `config`.
    pub fn from_config(
        config: &SessionConfig,
        http_client: Arc<dyn HttpClient>,
        storage: Arc<dyn SessionStorage>,
        navigator: Arc<dyn Navigator>,
        clock: Arc<dyn Clock>,
        event_bus: EventBus,
    ) -> Self {
        let refresher =
            HttpTokenRefresher::new(http_client, config.refresh_url.as_str(), clock.clone())
                .with_timeout(config.request_timeout);

        Self::new(
            TokenStore::new(storage, config.storage_key.clone()),
            Arc::new(refresher),
            navigator,
            clock,
            event_bus,
        )
        .with_login_url(config.login_url.as_str())
        .with_refresh_skew(config.refresh_skew_secs)
    }

    pub fn with_login_url(mut self, login_url: impl Into<String>) -> Self {
        self.login_url = login_url.into();
        self
    }

    /// Seconds before expiry at which a token is refreshed proactively.
    ///
    /// Never more than half of a token's lifetime is used, so a token is not
    /// already stale when it is issued.
    pub fn with_refresh_skew(mut self, skew_secs: i64) -> Self {
        self.skew_secs = skew_secs.max(0);
        self
    }

    pub fn login_url(&self) -> &str {
        &self.login_url
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    fn emit(&self, event: SessionEvent) {
        publish(&self.event_bus, event);
    }

    /// Establishes the session at boot.
    ///
    /// Login callback parameters in the current URL take precedence over a
    /// stored token; they are persisted and stripped from the visible URL. A
    /// callback carrying `error` leaves the session unauthenticated without
    /// consulting storage. Otherwise the stored token, if any, is restored.
    ///
    /// Calling this again discards the in-memory session and any in-flight
    /// refresh before re-reading the URL and storage.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<SessionState> {
        let mut inner = self.inner.lock().await;
        inner.epoch += 1;
        inner.in_flight = None;
        inner.current = None;

        let now = self.clock.now();
        let current_url = match self.navigator.current_url() {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(error = %e, "Current URL unavailable, skipping callback check");
                None
            }
        };

        let outcome = match current_url.as_deref() {
            Some(url) => parse_callback(url, now),
            None => Ok(CallbackOutcome::None),
        };

        if !matches!(outcome, Ok(CallbackOutcome::None)) {
            if let Some(url) = current_url.as_deref() {
                debug!(url = %redact_url_secrets(url), "Consuming login callback");
                self.replace_visible_url(url);
            }
        }

        match outcome {
            Ok(CallbackOutcome::Tokens(token)) => {
                if let Err(e) = self.store.save(&token).await {
                    warn!(error = %e, "Callback session will not survive a reload");
                }
                self.establish(&mut inner, token, SessionSource::Callback);
            }
            Ok(CallbackOutcome::Denied(reason)) => {
                warn!(reason = %reason, "Login callback reported an error");
                inner.state = SessionState::Unauthenticated;
                self.emit(SessionEvent::LoginFailed { reason });
            }
            Err(e) => {
                warn!(error = %e, "Ignoring malformed login callback");
                inner.state = SessionState::Unauthenticated;
                self.emit(SessionEvent::LoginFailed {
                    reason: e.to_string(),
                });
            }
            Ok(CallbackOutcome::None) => match self.store.load().await {
                Some(token) => self.establish(&mut inner, token, SessionSource::Restored),
                None => {
                    debug!("No session to restore");
                    inner.state = SessionState::Unauthenticated;
                }
            },
        }

        info!(state = %inner.state, "Session initialized");
        Ok(inner.state)
    }

    fn replace_visible_url(&self, url: &str) {
        let stripped = strip_callback_params(url);
        if stripped != url {
            if let Err(e) = self.navigator.replace_url(&stripped) {
                warn!(error = %e, "Failed to strip callback parameters from URL");
            }
        }
    }

    fn establish(&self, inner: &mut Inner, token: Token, source: SessionSource) {
        let id = SessionId::new();
        let expires_at = token.expires_at().timestamp();

        info!(
            session_id = %id,
            source = ?source,
            expires_at,
            "Session authenticated"
        );

        inner.current = Some(ActiveSession { id, token });
        inner.state = SessionState::Authenticated;
        self.emit(SessionEvent::Authenticated {
            session_id: id.to_string(),
            source,
            expires_at,
        });
    }

    /// Sends the user to the login entry point and returns its URL.
    #[instrument(skip(self), fields(login_url = %self.login_url))]
    pub async fn login(&self) -> Result<String> {
        {
            let mut inner = self.inner.lock().await;
            inner.state = SessionState::Authenticating;
        }

        self.emit(SessionEvent::Authenticating {
            login_url: self.login_url.clone(),
        });

        self.navigator
            .redirect(&self.login_url)
            .map_err(|e| AuthError::Navigation(e.to_string()))?;

        info!("Redirected to login");
        Ok(self.login_url.clone())
    }

    /// Returns an access token that is not due for refresh.
    ///
    /// A stale token is exchanged first; concurrent callers share a single
    /// exchange.
    ///
    /// # Errors
    ///
    /// - [`AuthError::NotAuthenticated`] when there is no session, or the
    ///   session was logged out while the refresh was running
    /// - [`AuthError::SessionExpired`] when the refresh failed; the session
    ///   and the stored token are discarded
    #[instrument(skip(self))]
    pub async fn get_valid_token(&self) -> Result<String> {
        let now = self.clock.now();

        let ticket = {
            let mut inner = self.inner.lock().await;
            let active = inner.current.as_ref().ok_or(AuthError::NotAuthenticated)?;

            let skew = effective_skew(&active.token, self.skew_secs);
            if !needs_refresh(&active.token, now, skew) {
                debug!("Token is valid, no refresh needed");
                return Ok(active.token.access_token.clone());
            }

            info!("Token expired or expiring soon, refreshing");
            self.join_or_start_refresh(&mut inner)?
        };

        self.finish_refresh(ticket).await
    }

    /// Refreshes regardless of the expiry arithmetic, after the API rejected
    /// `rejected_access_token`.
    ///
    /// If the current token already differs from the rejected one another
    /// caller refreshed in the meantime, and the current token is returned
    /// without a network call.
    #[instrument(skip(self, rejected_access_token))]
    pub async fn force_refresh(&self, rejected_access_token: &str) -> Result<String> {
        let ticket = {
            let mut inner = self.inner.lock().await;
            let active = inner.current.as_ref().ok_or(AuthError::NotAuthenticated)?;

            if active.token.access_token != rejected_access_token {
                debug!("Token already replaced since it was rejected");
                return Ok(active.token.access_token.clone());
            }

            info!("Access token rejected, forcing refresh");
            self.join_or_start_refresh(&mut inner)?
        };

        self.finish_refresh(ticket).await
    }

    fn join_or_start_refresh(&self, inner: &mut Inner) -> Result<RefreshTicket> {
        let (session_id, token) = match inner.current.as_ref() {
            Some(active) => (active.id, active.token.clone()),
            None => return Err(AuthError::NotAuthenticated),
        };

        if let Some(in_flight) = inner.in_flight.as_ref() {
            debug!(attempt = in_flight.attempt, "Joining in-flight refresh");
            return Ok(RefreshTicket {
                future: in_flight.future.clone(),
                epoch: inner.epoch,
            });
        }

        inner.attempts += 1;
        let attempt = inner.attempts;
        let job = RefreshJob {
            inner: Arc::clone(&self.inner),
            store: self.store.clone(),
            refresher: Arc::clone(&self.refresher),
            event_bus: self.event_bus.clone(),
            attempt,
            session_id,
        };
        let handle = tokio::spawn(job.run(token).instrument(Span::current()));
        let future = async move {
            handle.await.unwrap_or_else(|e| {
                Err(RefreshError::new(format!("refresh task failed: {}", e)))
            })
        }
        .boxed()
        .shared();

        inner.in_flight = Some(RefreshAttempt {
            attempt,
            future: future.clone(),
        });
        inner.state = SessionState::RefreshPending;
        self.emit(SessionEvent::Refreshing {
            session_id: session_id.to_string(),
        });

        Ok(RefreshTicket {
            future,
            epoch: inner.epoch,
        })
    }

    /// Awaits the shared exchange. Its outcome has already been applied by
    /// the refresh task when this resumes.
    async fn finish_refresh(&self, ticket: RefreshTicket) -> Result<String> {
        let outcome = ticket.future.await;
        let inner = self.inner.lock().await;

        if inner.epoch != ticket.epoch {
            debug!("Session ended while waiting for refresh");
            return Err(AuthError::NotAuthenticated);
        }

        match outcome {
            Ok(_) => inner
                .current
                .as_ref()
                .map(|active| active.token.access_token.clone())
                .ok_or(AuthError::NotAuthenticated),
            Err(e) => Err(e.into()),
        }
    }

    /// Ends the session from any state and sends the user to the login entry.
    ///
    /// The in-memory session, the stored token and any in-flight refresh are
    /// all discarded. A refresh that completes afterwards has no effect.
    ///
    /// # Errors
    ///
    /// The logout itself always happens. A failure to clear storage or to
    /// redirect is reported afterwards.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        let clear_result = {
            let mut inner = self.inner.lock().await;
            inner.epoch += 1;
            inner.in_flight = None;
            let session_id = inner.current.take().map(|active| active.id.to_string());
            inner.state = SessionState::LoggedOut;

            let clear_result = self.store.clear().await;

            info!(session_id = ?session_id, "Logged out");
            self.emit(SessionEvent::LoggedOut { session_id });
            clear_result
        };

        let redirect_result = self
            .navigator
            .redirect(&self.login_url)
            .map_err(|e| AuthError::Navigation(e.to_string()));

        clear_result.and(redirect_result)
    }

    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    pub async fn is_authenticated(&self) -> bool {
        self.inner.lock().await.current.is_some()
    }

    /// Token-free snapshot of the current session, `None` when there is none.
    pub async fn current_session(&self) -> Option<Session> {
        let inner = self.inner.lock().await;
        inner.current.as_ref().map(|active| Session {
            id: active.id,
            state: inner.state,
            expires_at: active.token.expires_at(),
            refresh_due_at: refresh_due_at(
                &active.token,
                effective_skew(&active.token, self.skew_secs),
            ),
            has_refresh_token: active.token.has_refresh_token(),
        })
    }
}
