use reqwest::StatusCode;
use tokio::sync::OnceCell;

use crate::ports::catalog::{
    CatalogClient, CatalogError, CatalogPlaylist, CatalogPlaylistPage, CatalogTrack,
};
use crate::spotify_rs::types::{Paging, SpotifyPlaylist, SpotifyTrack};
use crate::spotify_rs::{SpotifyApiError, SpotifyClient, track_uri};

pub const DEFAULT_SEARCH_LIMIT: u32 = 20;

const PLAYLIST_DESCRIPTION: &str = "Imported from iTunes";

/// [`CatalogClient`] backed by the Spotify Web API.
pub struct SpotifyCatalog {
    client: SpotifyClient,
    search_limit: u32,
    user_id: OnceCell<String>,
}

impl SpotifyCatalog {
    pub fn new(client: SpotifyClient, search_limit: u32) -> Self {
        Self {
            client,
            search_limit: search_limit.clamp(1, 50),
            user_id: OnceCell::new(),
        }
    }

    /// Use a known user id instead of asking `/me`.
    pub fn with_user_id(self, user_id: String) -> Self {
        Self {
            user_id: OnceCell::new_with(Some(user_id)),
            ..self
        }
    }
}

#[async_trait::async_trait]
impl CatalogClient for SpotifyCatalog {
    async fn current_user_id(&self) -> Result<String, CatalogError> {
        let id = self
            .user_id
            .get_or_try_init(|| async {
                let user = self.client.get_current_user().await.map_err(to_catalog_error)?;
                log::debug!(
                    "Authenticated as {} ({})",
                    user.display_name.as_deref().unwrap_or("unnamed"),
                    user.id
                );
                Ok::<_, CatalogError>(user.id)
            })
            .await?;
        Ok(id.clone())
    }

    async fn search_tracks(&self, query: &str) -> Result<Vec<CatalogTrack>, CatalogError> {
        let tracks = self
            .client
            .search_tracks(query, self.search_limit)
            .await
            .map_err(to_catalog_error)?;
        Ok(tracks.into_iter().filter_map(to_catalog_track).collect())
    }

    async fn create_playlist(&self, owner_id: &str, title: &str) -> Result<String, CatalogError> {
        let playlist = self
            .client
            .create_playlist(owner_id, title, PLAYLIST_DESCRIPTION)
            .await
            .map_err(to_catalog_error)?;
        Ok(playlist.id)
    }

    async fn add_items(&self, playlist_id: &str, track_ids: &[String]) -> Result<(), CatalogError> {
        let uris: Vec<String> = track_ids.iter().map(|id| track_uri(id)).collect();
        let snapshot = self
            .client
            .add_tracks_to_playlist(playlist_id, &uris)
            .await
            .map_err(to_catalog_error)?;
        log::debug!(
            "Playlist {} is now at snapshot {}",
            playlist_id,
            snapshot.snapshot_id
        );
        Ok(())
    }

    async fn owned_playlists(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<CatalogPlaylistPage, CatalogError> {
        let owner_id = self.current_user_id().await?;
        let page = self
            .client
            .get_user_playlists_page(limit, offset)
            .await
            .map_err(to_catalog_error)?;
        Ok(owned_page(page, &owner_id, limit, offset))
    }

    async fn delete_playlist(&self, playlist_id: &str) -> Result<(), CatalogError> {
        self.client
            .unfollow_playlist(playlist_id)
            .await
            .map_err(to_catalog_error)
    }
}

/// Tracks without an id (local files) can't be added to a playlist.
fn to_catalog_track(track: SpotifyTrack) -> Option<CatalogTrack> {
    Some(CatalogTrack {
        id: track.id?,
        title: track.name,
        artists: track.artists.into_iter().map(|artist| artist.name).collect(),
        album: track.album.name,
    })
}

/// Keep only playlists owned by `owner_id`; followed playlists are not ours to delete.
fn owned_page(
    page: Paging<SpotifyPlaylist>,
    owner_id: &str,
    limit: u32,
    offset: u32,
) -> CatalogPlaylistPage {
    let next_offset = page.next.as_ref().map(|_| offset + limit);
    let playlists = page
        .items
        .into_iter()
        .filter(|playlist| playlist.owner.id == owner_id)
        .map(|playlist| CatalogPlaylist {
            id: playlist.id,
            name: playlist.name,
        })
        .collect();

    CatalogPlaylistPage {
        playlists,
        next_offset,
    }
}

fn to_catalog_error(error: SpotifyApiError) -> CatalogError {
    match error {
        SpotifyApiError::Status {
            status,
            message,
            retry_after,
        } => match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => CatalogError::Unauthorized {
                status: status.as_u16(),
                message,
            },
            StatusCode::TOO_MANY_REQUESTS => CatalogError::RateLimited { retry_after },
            status if status.is_server_error() => CatalogError::Server {
                status: status.as_u16(),
                message,
            },
            status => CatalogError::Api {
                status: status.as_u16(),
                message,
            },
        },
        SpotifyApiError::FailedToSendRequest(error) => CatalogError::Transport(error),
        SpotifyApiError::FailedToParseResponse(error) => CatalogError::Decode(error.to_string()),
        SpotifyApiError::InvalidUrl(error) => CatalogError::Decode(error.to_string()),
    }
}
