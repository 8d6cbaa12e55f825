use serde::{Deserialize, Serialize};

/// Spotify user profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyUser {
    pub id: String,
    pub display_name: Option<String>,
}

/// Spotify playlist from API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyPlaylist {
    pub id: String,
    pub name: String,
    pub owner: SpotifyUser,
}

/// Spotify track from API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyTrack {
    /// Missing for local files and some unavailable tracks.
    pub id: Option<String>,
    pub name: String,
    pub artists: Vec<SpotifyArtist>,
    pub album: SpotifyAlbum,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyArtist {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyAlbum {
    pub name: String,
}

/// Spotify paging object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paging<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    pub next: Option<String>,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub total: u32,
}

/// Response of `GET /search?type=track`. Spotify occasionally sends `null` items.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub tracks: Paging<Option<SpotifyTrack>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatePlaylistRequest<'a> {
    pub name: &'a str,
    pub public: bool,
    pub description: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddTracksRequest<'a> {
    pub uris: &'a [String],
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotResponse {
    pub snapshot_id: String,
}

/// Error body returned by the Web API.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorObject,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorObject {
    pub message: String,
}
