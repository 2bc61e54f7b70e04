//! Web API endpoint descriptors, relative to the API base URL.

use core_auth::Endpoint;

use crate::error::{Result, SpotifyError};
use crate::types::TimeRange;

pub const CURRENT_USER: &str = "/me";
pub const TOP_ARTISTS: &str = "/me/top/artists";
pub const TOP_TRACKS: &str = "/me/top/tracks";
pub const CURRENT_USER_PLAYLISTS: &str = "/me/playlists";

pub fn current_user_profile() -> Endpoint {
    Endpoint::get(CURRENT_USER)
}

pub fn top_artists(range: TimeRange) -> Endpoint {
    Endpoint::get(TOP_ARTISTS).with_query("time_range", range.as_str())
}

pub fn top_tracks(range: TimeRange) -> Endpoint {
    Endpoint::get(TOP_TRACKS).with_query("time_range", range.as_str())
}

pub fn current_user_playlists() -> Endpoint {
    Endpoint::get(CURRENT_USER_PLAYLISTS)
}

/// `GET /playlists/{id}` with `id` percent-encoded.
pub fn playlist(playlist_id: &str) -> Result<Endpoint> {
    if playlist_id.trim().is_empty() {
        return Err(SpotifyError::InvalidId(playlist_id.to_string()));
    }

    Ok(Endpoint::get(format!(
        "/playlists/{}",
        urlencoding::encode(playlist_id)
    )))
}
