use std::time::Duration;

/// A track returned by a catalog search, decoupled from the API payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogTrack {
    pub id: String,
    pub title: String,
    /// Credited artists, primary artist first.
    pub artists: Vec<String>,
    pub album: String,
}

impl CatalogTrack {
    pub fn primary_artist(&self) -> Option<&str> {
        self.artists.first().map(String::as_str)
    }
}

/// A playlist owned by the authenticated user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogPlaylist {
    pub id: String,
    pub name: String,
}

/// One page of owned playlists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogPlaylistPage {
    pub playlists: Vec<CatalogPlaylist>,
    /// Offset of the next page, if there is one.
    pub next_offset: Option<u32>,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Catalog rejected the credentials ({status}): {message}")]
    Unauthorized { status: u16, message: String },
    #[error("Rate limited by catalog (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },
    #[error("Catalog server error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("Catalog request failed ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Failed to send catalog request: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("Failed to decode catalog response: {0}")]
    Decode(String),
}

impl CatalogError {
    /// Whether retrying the same call might succeed.
    ///
    /// Rate limits, 5xx responses and connection/timeout failures are
    /// transient. Credential and request errors are not.
    pub fn is_transient(&self) -> bool {
        match self {
            CatalogError::RateLimited { .. } | CatalogError::Server { .. } => true,
            CatalogError::Transport(error) => error.is_timeout() || error.is_connect(),
            CatalogError::Unauthorized { .. }
            | CatalogError::Api { .. }
            | CatalogError::Decode(_) => false,
        }
    }
}

/// Port trait wrapping the catalog capabilities the migration needs.
///
/// Implementations live in `services::spotify::client` (production) or test mocks.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogClient: Send + Sync {
    /// Id of the authenticated user, used as the owner of created playlists.
    async fn current_user_id(&self) -> Result<String, CatalogError>;

    async fn search_tracks(&self, query: &str) -> Result<Vec<CatalogTrack>, CatalogError>;

    async fn create_playlist(&self, owner_id: &str, title: &str) -> Result<String, CatalogError>;

    /// Append tracks to a playlist. Callers must keep `track_ids` within
    /// [`MAX_ITEMS_PER_ADD`].
    async fn add_items(&self, playlist_id: &str, track_ids: &[String]) -> Result<(), CatalogError>;

    /// One page (at most [`MAX_PLAYLIST_PAGE`]) of playlists owned by the
    /// authenticated user. Pages can come back short when other users'
    /// playlists are filtered out, so follow `next_offset` rather than the length.
    async fn owned_playlists(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<CatalogPlaylistPage, CatalogError>;

    async fn delete_playlist(&self, playlist_id: &str) -> Result<(), CatalogError>;
}

/// Upper bound on items accepted by a single [`CatalogClient::add_items`] call.
pub const MAX_ITEMS_PER_ADD: usize = 100;

/// Upper bound on the page size of [`CatalogClient::owned_playlists`].
pub const MAX_PLAYLIST_PAGE: u32 = 50;
