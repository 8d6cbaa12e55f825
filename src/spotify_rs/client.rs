use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode, header::RETRY_AFTER};
use serde::de::DeserializeOwned;
use url::Url;

use crate::spotify_rs::error::SpotifyApiError;
use crate::spotify_rs::types::{
    AddTracksRequest, CreatePlaylistRequest, ErrorResponse, Paging, SearchResponse,
    SnapshotResponse, SpotifyPlaylist, SpotifyTrack, SpotifyUser,
};

pub const DEFAULT_API_BASE_URL: &str = "https://api.spotify.com/v1/";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

type Result<T> = std::result::Result<T, SpotifyApiError>;

/// `spotify:track:<id>` as expected by the playlist endpoints.
pub fn track_uri(track_id: &str) -> String {
    format!("spotify:track:{}", track_id)
}

/// Spotify API client
#[derive(Debug, Clone)]
pub struct SpotifyClient {
    access_token: String,
    base_url: Url,
    timeout: Duration,
    client: reqwest::Client,
}

impl SpotifyClient {
    /// Client against a custom API root, e.g. a local proxy.
    pub fn with_base_url(access_token: String, base_url: &str, timeout: Duration) -> Result<Self> {
        // Url::join drops the last path segment unless it ends with a slash
        let base_url = if base_url.ends_with('/') {
            Url::parse(base_url)?
        } else {
            Url::parse(&format!("{}/", base_url))?
        };

        Ok(Self {
            access_token,
            base_url,
            timeout,
            client: reqwest::Client::new(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    /// Get the current user's profile
    pub async fn get_current_user(&self) -> Result<SpotifyUser> {
        let url = self.endpoint("me")?;
        self.send_json(self.client.get(url)).await
    }

    /// Search the catalog for tracks matching a free-text query.
    pub async fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<SpotifyTrack>> {
        let mut url = self.endpoint("search")?;
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("type", "track")
            .append_pair("limit", &limit.to_string());

        let response: SearchResponse = self.send_json(self.client.get(url)).await?;
        Ok(response.tracks.items.into_iter().flatten().collect())
    }

    /// Create a private playlist for `user_id`. Returns the new playlist.
    pub async fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        description: &str,
    ) -> Result<SpotifyPlaylist> {
        let url = self.endpoint(&format!("users/{}/playlists", user_id))?;
        let body = CreatePlaylistRequest {
            name,
            public: false,
            description,
        };
        self.send_json(self.client.post(url).json(&body)).await
    }

    /// Append tracks (by URI) to the end of a playlist. At most 100 per call.
    pub async fn add_tracks_to_playlist(
        &self,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<SnapshotResponse> {
        let url = self.endpoint(&format!("playlists/{}/tracks", playlist_id))?;
        let body = AddTracksRequest { uris };
        self.send_json(self.client.post(url).json(&body)).await
    }

    /// One page of the current user's playlists, including followed ones.
    pub async fn get_user_playlists_page(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<Paging<SpotifyPlaylist>> {
        let mut url = self.endpoint("me/playlists")?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string())
            .append_pair("offset", &offset.to_string());
        self.send_json(self.client.get(url)).await
    }

    /// Unfollow a playlist. For an owned playlist this is how Spotify deletes it.
    pub async fn unfollow_playlist(&self, playlist_id: &str) -> Result<()> {
        let url = self.endpoint(&format!("playlists/{}/followers", playlist_id))?;
        self.send(self.client.delete(url)).await?;
        Ok(())
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        self.send(request)
            .await?
            .json()
            .await
            .map_err(SpotifyApiError::FailedToParseResponse)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request
            .bearer_auth(&self.access_token)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(SpotifyApiError::FailedToSendRequest)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = if status == StatusCode::TOO_MANY_REQUESTS {
            response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(parse_retry_after)
        } else {
            None
        };
        let body = response.text().await.unwrap_or_default();

        Err(SpotifyApiError::Status {
            status,
            message: error_message(status, &body),
            retry_after,
        })
    }
}

/// `Retry-After` is a number of seconds on the Web API.
fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// Prefer the message from the JSON error body, fall back to the raw body.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(error) = serde_json::from_str::<ErrorResponse>(body) {
        return error.error.message;
    }
    let body = body.trim();
    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    } else {
        body.to_string()
    }
}
