//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (HTTP, session
//! storage, navigation, clock) into the session core and the Spotify
//! connector. Desktop hosts typically enable the `desktop-shims` feature
//! (which depends on `bridge-desktop`); other hosts pass their own bridges to
//! [`CoreDependencies::new`].

pub mod error;

pub use error::{CoreError, Result};

use std::sync::Arc;

use bridge_traits::{
    http::HttpClient, navigation::Navigator, storage::SessionStorage, time::Clock,
};
use core_auth::{AuthorizedClient, SessionManager, SessionState};
use core_runtime::config::SessionConfig;
use core_runtime::events::EventBus;
use provider_spotify::SpotifyConnector;
use tracing::{info, warn};

#[cfg(feature = "desktop-shims")]
use bridge_desktop::{FileSessionStorage, MemoryNavigator, ReqwestHttpClient};

/// Aggregated handle to all bridge dependencies the core requires.
#[derive(Clone)]
pub struct CoreDependencies {
    pub http_client: Arc<dyn HttpClient>,
    pub storage: Arc<dyn SessionStorage>,
    pub navigator: Arc<dyn Navigator>,
    pub clock: Arc<dyn Clock>,
}

impl CoreDependencies {
    /// Construct a dependency bundle from explicit bridge handles.
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        storage: Arc<dyn SessionStorage>,
        navigator: Arc<dyn Navigator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            http_client,
            storage,
            navigator,
            clock,
        }
    }

    /// Desktop bridges for `origin`, with the visible location at `current_url`.
    #[cfg(feature = "desktop-shims")]
    pub fn desktop(origin: &str, current_url: impl Into<String>) -> Self {
        Self::desktop_with_navigator(origin, Arc::new(MemoryNavigator::new(current_url)))
    }

    /// Desktop bridges sharing a navigator the embedding shell keeps driving.
    #[cfg(feature = "desktop-shims")]
    pub fn desktop_with_navigator(origin: &str, navigator: Arc<MemoryNavigator>) -> Self {
        Self {
            http_client: Arc::new(ReqwestHttpClient::new()),
            storage: Arc::new(FileSessionStorage::for_origin(origin)),
            navigator,
            clock: Arc::new(bridge_traits::time::SystemClock),
        }
    }

    /// Like [`desktop`](Self::desktop), keeping the session in the OS keychain.
    #[cfg(feature = "secure-store")]
    pub fn desktop_secure(origin: &str, current_url: impl Into<String>) -> Self {
        Self {
            storage: Arc::new(bridge_desktop::KeyringSessionStorage::for_origin(origin)),
            ..Self::desktop(origin, current_url)
        }
    }
}

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    config: Arc<SessionConfig>,
    deps: Arc<CoreDependencies>,
    events: EventBus,
    session: Arc<SessionManager>,
    spotify: SpotifyConnector,
}

impl CoreService {
    /// Build the session core from `config` and `deps` and establish the
    /// session.
    ///
    /// Login callback parameters in the current URL are consumed, otherwise a
    /// stored session is restored. A restored token that is already stale is
    /// refreshed right away; if that fails the service still starts,
    /// unauthenticated.
    ///
    /// ```no_run
    /// # #[cfg(feature = "desktop-shims")]
    /// # async fn example() -> core_service::Result<()> {
    /// use core_runtime::config::SessionConfig;
    /// use core_service::{CoreDependencies, CoreService};
    ///
    /// let config = SessionConfig::builder().build()?;
    /// let deps = CoreDependencies::desktop("http://localhost:3000", "http://localhost:3000/");
    /// let core = CoreService::bootstrap(config, deps).await?;
    ///
    /// if core.state().await.is_authenticated() {
    ///     let profile = core.spotify().current_user_profile().await?;
    ///     println!("{} Followers", profile.follower_count());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn bootstrap(config: SessionConfig, deps: CoreDependencies) -> Result<Self> {
        config.validate()?;

        let events = EventBus::new(config.event_buffer_size);
        let session = Arc::new(SessionManager::from_config(
            &config,
            Arc::clone(&deps.http_client),
            Arc::clone(&deps.storage),
            Arc::clone(&deps.navigator),
            Arc::clone(&deps.clock),
            events.clone(),
        ));

        let state = session.initialize().await?;
        if state.is_authenticated() {
            if let Err(e) = session.get_valid_token().await {
                warn!(error = %e, "Stored session could not be revived");
            }
        }

        let client = AuthorizedClient::new(
            Arc::clone(&session),
            Arc::clone(&deps.http_client),
            config.api_base_url.clone(),
        )
        .with_timeout(config.request_timeout);
        let spotify = SpotifyConnector::new(Arc::new(client));

        let state = session.state().await;
        info!(state = %state, "Core service ready");

        Ok(Self {
            config: Arc::new(config),
            deps: Arc::new(deps),
            events,
            session,
            spotify,
        })
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn spotify(&self) -> &SpotifyConnector {
        &self.spotify
    }

    /// Bus carrying every session transition.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Access the bridge dependencies being used by the service.
    pub fn dependencies(&self) -> Arc<CoreDependencies> {
        Arc::clone(&self.deps)
    }

    pub async fn state(&self) -> SessionState {
        self.session.state().await
    }

    pub async fn login(&self) -> Result<String> {
        Ok(self.session.login().await?)
    }

    pub async fn logout(&self) -> Result<()> {
        Ok(self.session.logout().await?)
    }
}
