//! Minimal Spotify Web API client.
//! Docs: https://developer.spotify.com/documentation/web-api

pub mod client;
pub mod error;
pub mod types;

pub use client::{SpotifyClient, track_uri};
pub use error::SpotifyApiError;
