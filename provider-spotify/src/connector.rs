//! Spotify Web API connector
//!
//! Read-only access to the signed-in user's profile, top items and
//! playlists. Every request goes through [`AuthorizedClient`], which owns
//! token injection and the single retry on `401`.

use core_auth::{ApiError, AuthorizedClient, Endpoint};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::endpoints;
use crate::error::{Result, SpotifyError};
use crate::types::{Artist, Paging, Playlist, SimplifiedPlaylist, TimeRange, Track, UserProfile};

/// Spotify Web API connector
///
/// # Example
///
/// ```ignore
/// use provider_spotify::{SpotifyConnector, TimeRange};
///
/// let connector = SpotifyConnector::new(authorized_client);
/// let profile = connector.current_user_profile().await?;
/// let artists = connector.top_artists(TimeRange::ShortTerm).await?;
/// ```
#[derive(Clone)]
pub struct SpotifyConnector {
    client: Arc<AuthorizedClient>,
}

impl SpotifyConnector {
    pub fn new(client: Arc<AuthorizedClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<AuthorizedClient> {
        &self.client
    }

    async fn fetch<T: DeserializeOwned>(&self, endpoint: &Endpoint) -> Result<T> {
        Ok(self.client.call_json(endpoint).await?)
    }

    #[instrument(skip(self))]
    pub async fn current_user_profile(&self) -> Result<UserProfile> {
        let profile: UserProfile = self.fetch(&endpoints::current_user_profile()).await?;
        info!(
            user_id = %profile.id,
            followers = profile.follower_count(),
            "Fetched user profile"
        );
        Ok(profile)
    }

    #[instrument(skip(self), fields(time_range = %range))]
    pub async fn top_artists(&self, range: TimeRange) -> Result<Paging<Artist>> {
        let page: Paging<Artist> = self.fetch(&endpoints::top_artists(range)).await?;
        debug!(count = page.items.len(), "Fetched top artists");
        Ok(page)
    }

    #[instrument(skip(self), fields(time_range = %range))]
    pub async fn top_tracks(&self, range: TimeRange) -> Result<Paging<Track>> {
        let page: Paging<Track> = self.fetch(&endpoints::top_tracks(range)).await?;
        debug!(count = page.items.len(), "Fetched top tracks");
        Ok(page)
    }

    #[instrument(skip(self))]
    pub async fn current_user_playlists(&self) -> Result<Paging<SimplifiedPlaylist>> {
        let page: Paging<SimplifiedPlaylist> =
            self.fetch(&endpoints::current_user_playlists()).await?;
        debug!(count = page.items.len(), total = page.total, "Fetched playlists");
        Ok(page)
    }

    #[instrument(skip(self))]
    pub async fn playlist(&self, playlist_id: &str) -> Result<Playlist> {
        let endpoint = endpoints::playlist(playlist_id)?;

        match self.client.call_json(&endpoint).await {
            Ok(playlist) => Ok(playlist),
            Err(ApiError::Status { status: 404, .. }) => Err(SpotifyError::PlaylistNotFound {
                playlist_id: playlist_id.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
    use bridge_traits::navigation::Navigator;
    use bridge_traits::storage::SessionStorage;
    use bridge_traits::time::Clock;
    use chrono::{DateTime, TimeZone, Utc};
    use core_auth::{RefreshError, SessionManager, Token, TokenStore};
    use core_runtime::config::SessionConfig;
    use core_runtime::events::EventBus;
    use mockall::mock;
    use std::collections::HashMap;
    use std::sync::Mutex;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    mock! {
        Refresher {}

        #[async_trait]
        impl core_auth::Refresher for Refresher {
            async fn refresh(&self, token: &Token) -> std::result::Result<Token, RefreshError>;
        }
    }

    #[derive(Default)]
    struct MemoryStorage {
        values: Mutex<HashMap<String, String>>,
    }

    #[async_trait]
    impl SessionStorage for MemoryStorage {
        async fn get(&self, key: &str) -> BridgeResult<Option<String>> {
            Ok(self.values.lock().unwrap().get(key).cloned())
        }

        async fn set(&self, key: &str, value: &str) -> BridgeResult<()> {
            self.values.lock().unwrap().insert(key.into(), value.into());
            Ok(())
        }

        async fn remove(&self, key: &str) -> BridgeResult<()> {
            self.values.lock().unwrap().remove(key);
            Ok(())
        }
    }

    struct Root;

    impl Navigator for Root {
        fn current_url(&self) -> BridgeResult<String> {
            Ok("http://localhost:3000/".to_string())
        }

        fn replace_url(&self, _url: &str) -> BridgeResult<()> {
            Ok(())
        }

        fn redirect(&self, _url: &str) -> BridgeResult<()> {
            Ok(())
        }
    }

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    async fn connector(http: MockHttpClient) -> SpotifyConnector {
        let issued = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let storage = Arc::new(MemoryStorage::default());
        let store = TokenStore::new(storage, "spotify_session");
        store
            .save(&Token::new("abc", issued, 3600, Some("xyz".into())))
            .await
            .unwrap();

        let mut refresher = MockRefresher::new();
        refresher.expect_refresh().times(0);

        let session = Arc::new(SessionManager::new(
            store,
            Arc::new(refresher),
            Arc::new(Root),
            Arc::new(FixedClock(issued)),
            EventBus::new(8),
        ));
        session.initialize().await.unwrap();

        let config = SessionConfig::builder().build().unwrap();
        let client = AuthorizedClient::new(session, Arc::new(http), config.api_base_url);
        SpotifyConnector::new(Arc::new(client))
    }

    fn ok(body: &'static str) -> BridgeResult<HttpResponse> {
        Ok(HttpResponse::new(200, body))
    }

    #[tokio::test]
    async fn test_current_user_profile() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .times(1)
            .withf(|req| {
                req.url == "https://api.spotify.com/v1/me"
                    && req.authorization() == Some("Bearer abc")
            })
            .returning(|_| {
                ok(r#"{
                    "id": "ada",
                    "display_name": "Ada",
                    "followers": {"total": 7},
                    "images": [{"url": "https://i.scdn.co/image/ab67"}]
                }"#)
            });

        let profile = connector(http).await.current_user_profile().await.unwrap();

        assert_eq!(profile.name(), "Ada");
        assert_eq!(profile.follower_count(), 7);
        assert_eq!(profile.avatar_url(), Some("https://i.scdn.co/image/ab67"));
    }

    #[tokio::test]
    async fn test_top_artists_uses_time_range() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .times(1)
            .withf(|req| req.url == "https://api.spotify.com/v1/me/top/artists?time_range=long_term")
            .returning(|_| {
                ok(r#"{
                    "items": [{"id": "a1", "name": "Daft Punk", "genres": ["french house"]}],
                    "total": 1, "limit": 20, "offset": 0, "next": null
                }"#)
            });

        let page = connector(http)
            .await
            .top_artists(TimeRange::default())
            .await
            .unwrap();

        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].name, "Daft Punk");
    }

    #[tokio::test]
    async fn test_top_tracks() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .times(1)
            .withf(|req| req.url.ends_with("/me/top/tracks?time_range=medium_term"))
            .returning(|_| {
                ok(r#"{
                    "items": [{
                        "id": "t1", "name": "One More Time",
                        "artists": [{"id": "a1", "name": "Daft Punk"}],
                        "album": {"id": "al1", "name": "Discovery"},
                        "duration_ms": 320000
                    }],
                    "total": 1
                }"#)
            });

        let page = connector(http)
            .await
            .top_tracks(TimeRange::MediumTerm)
            .await
            .unwrap();

        assert_eq!(page.items[0].artist_names(), "Daft Punk");
    }

    #[tokio::test]
    async fn test_current_user_playlists() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .times(1)
            .withf(|req| req.url == "https://api.spotify.com/v1/me/playlists")
            .returning(|_| {
                ok(r#"{
                    "items": [{
                        "id": "p1", "name": "Road trip", "images": [],
                        "owner": {"id": "ada"}, "tracks": {"total": 12}
                    }],
                    "total": 1,
                    "next": "https://api.spotify.com/v1/me/playlists?offset=20"
                }"#)
            });

        let page = connector(http).await.current_user_playlists().await.unwrap();

        assert_eq!(page.items[0].tracks.total, 12);
        assert!(page.has_more());
    }

    #[tokio::test]
    async fn test_playlist_not_found() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .times(1)
            .withf(|req| req.url == "https://api.spotify.com/v1/playlists/gone")
            .returning(|_| {
                Ok(HttpResponse::new(
                    404,
                    r#"{"error":{"status":404,"message":"Not found."}}"#,
                ))
            });

        let result = connector(http).await.playlist("gone").await;

        assert!(matches!(
            result,
            Err(SpotifyError::PlaylistNotFound { ref playlist_id }) if playlist_id == "gone"
        ));
    }

    #[tokio::test]
    async fn test_invalid_playlist_id_makes_no_request() {
        let mut http = MockHttpClient::new();
        http.expect_execute().times(0);

        let result = connector(http).await.playlist("").await;
        assert!(matches!(result, Err(SpotifyError::InvalidId(_))));
    }

    #[tokio::test]
    async fn test_transport_error_is_surfaced() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .times(1)
            .returning(|_| Err(BridgeError::Timeout("30s".into())));

        let result = connector(http).await.current_user_profile().await;
        assert!(matches!(
            result,
            Err(SpotifyError::Api(ApiError::Network(_)))
        ));
    }
}
