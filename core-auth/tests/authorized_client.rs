mod common;

use bridge_traits::error::BridgeError;
use common::*;
use core_auth::{ApiError, AuthError, Endpoint, SessionState};
use serde::Deserialize;

const ME_URL: &str = "https://api.spotify.com/v1/me";
const REFRESHED: &str = r#"{"access_token":"new","expires_in":3600}"#;

#[derive(Debug, Deserialize)]
struct Me {
    display_name: String,
}

async fn authenticated() -> Harness {
    let h = Harness::new(ROOT_URL, ISSUED + 10);
    h.seed(&stored_token("abc", "xyz")).await;
    h.manager.initialize().await.unwrap();
    h
}

#[tokio::test]
async fn test_call_sends_bearer_token() {
    let h = authenticated().await;
    h.http.respond(ME_URL, 200, r#"{"display_name":"Ada"}"#);

    let me: Me = h.client().call_json(&Endpoint::get("/me")).await.unwrap();

    assert_eq!(me.display_name, "Ada");
    let sent = h.http.requests_to(ME_URL);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].authorization(), Some("Bearer abc"));
}

#[tokio::test]
async fn test_unauthorized_then_ok_refreshes_once_and_retries_once() {
    let h = authenticated().await;
    h.http.respond(ME_URL, 401, r#"{"error":{"status":401,"message":"The access token expired"}}"#);
    h.http.respond(ME_URL, 200, r#"{"display_name":"Ada"}"#);
    h.http.respond(REFRESH_URL, 200, REFRESHED);

    let me: Me = h.client().call_json(&Endpoint::get("/me")).await.unwrap();
    assert_eq!(me.display_name, "Ada");

    assert_eq!(h.http.requests_to(REFRESH_URL).len(), 1);
    let sent = h.http.requests_to(ME_URL);
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].authorization(), Some("Bearer abc"));
    assert_eq!(sent[1].authorization(), Some("Bearer new"));
    assert_eq!(h.manager.state().await, SessionState::Authenticated);
}

#[tokio::test]
async fn test_unauthorized_twice_logs_out() {
    let h = authenticated().await;
    h.http.respond(ME_URL, 401, "");
    h.http.respond(ME_URL, 401, "");
    h.http.respond(REFRESH_URL, 200, REFRESHED);

    let result = h.client().call(&Endpoint::get("/me")).await;

    assert!(matches!(result, Err(ApiError::Unauthorized)));
    assert_eq!(h.http.requests_to(REFRESH_URL).len(), 1);
    assert_eq!(h.http.requests_to(ME_URL).len(), 2);
    assert_eq!(h.manager.state().await, SessionState::LoggedOut);
    assert!(h.storage.record().await.is_none());
    assert_eq!(h.navigator.redirects(), vec![LOGIN_URL.to_string()]);
}

#[tokio::test]
async fn test_refresh_failure_after_unauthorized_surfaces_session_error() {
    let h = authenticated().await;
    h.http.respond(ME_URL, 401, "");
    h.http.respond(REFRESH_URL, 400, r#"{"error":"invalid_grant"}"#);

    let result = h.client().call(&Endpoint::get("/me")).await;

    assert!(matches!(
        result,
        Err(ApiError::Session(AuthError::SessionExpired { .. }))
    ));
    assert_eq!(h.http.requests_to(ME_URL).len(), 1);
    assert_eq!(h.manager.state().await, SessionState::Unauthenticated);
}

#[tokio::test]
async fn test_other_statuses_do_not_touch_the_session() {
    let h = authenticated().await;
    let url = "https://api.spotify.com/v1/playlists/missing";
    h.http.respond(
        url,
        404,
        r#"{"error":{"status":404,"message":"Non existing id"}}"#,
    );

    let result = h.client().call(&Endpoint::get("/playlists/missing")).await;

    match result {
        Err(ApiError::Status { status, message }) => {
            assert_eq!(status, 404);
            assert_eq!(message, "Non existing id");
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(h.http.requests_to(REFRESH_URL).len(), 0);
    assert_eq!(h.manager.state().await, SessionState::Authenticated);
}

#[tokio::test]
async fn test_transport_failure_is_network_error() {
    let h = authenticated().await;
    h.http.fail(ME_URL, BridgeError::Timeout("30s".into()));

    let result = h.client().call(&Endpoint::get("/me")).await;

    assert!(matches!(result, Err(ApiError::Network(_))));
    assert_eq!(h.manager.state().await, SessionState::Authenticated);
}

#[tokio::test]
async fn test_undecodable_body_is_decode_error() {
    let h = authenticated().await;
    h.http.respond(ME_URL, 200, "<html>");

    let result: Result<Me, _> = h.client().call_json(&Endpoint::get("/me")).await;
    assert!(matches!(result, Err(ApiError::Decode(_))));
}

#[tokio::test]
async fn test_query_is_appended_to_base_url() {
    let h = authenticated().await;
    let url = "https://api.spotify.com/v1/me/top/artists?time_range=short_term";
    h.http.respond(url, 200, r#"{"items":[]}"#);

    let endpoint = Endpoint::get("/me/top/artists").with_query("time_range", "short_term");
    assert_eq!(h.client().resolve(&endpoint).unwrap().as_str(), url);

    h.client().call(&endpoint).await.unwrap();
    assert_eq!(h.http.requests_to(url).len(), 1);
}

#[tokio::test]
async fn test_no_session_makes_no_request() {
    let h = Harness::new(ROOT_URL, ISSUED);
    h.manager.initialize().await.unwrap();

    let result = h.client().call(&Endpoint::get("/me")).await;

    assert!(matches!(
        result,
        Err(ApiError::Session(AuthError::NotAuthenticated))
    ));
    assert_eq!(h.http.request_count(), 0);
}
