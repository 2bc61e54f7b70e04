//! # Spotify Provider
//!
//! Typed access to the Spotify Web API for the profile views.
//!
//! ## Overview
//!
//! This module provides:
//! - Endpoint descriptors for the current user's profile, top artists and
//!   tracks, and playlists
//! - Response types covering the displayed fields
//! - [`SpotifyConnector`], which performs the calls through the session's
//!   [`AuthorizedClient`](core_auth::AuthorizedClient)

pub mod connector;
pub mod endpoints;
pub mod error;
pub mod types;

pub use connector::SpotifyConnector;
pub use error::{Result, SpotifyError};
pub use types::{
    Album, Artist, Followers, Image, Paging, Playlist, PlaylistItem, PlaylistOwner,
    SimplifiedArtist, SimplifiedPlaylist, TimeRange, Track, TracksRef, UserProfile,
};
