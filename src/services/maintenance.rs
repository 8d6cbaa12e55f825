//! Removing every playlist owned by the authenticated user.
//!
//! This is blunt: it does not check whether a playlist came from a migration.
//! It only runs behind a [`ClearConfirmation`] and is never part of `migrate`.

use color_eyre::eyre::{Result, WrapErr};

use crate::ports::catalog::{CatalogClient, CatalogError, CatalogPlaylist, MAX_PLAYLIST_PAGE};
use crate::services::retry::RetryPolicy;

/// Phrase a user has to type to confirm interactively.
pub const CONFIRMATION_PHRASE: &str = "delete all playlists";

/// Proof that the user explicitly asked to delete every owned playlist.
#[derive(Debug)]
pub struct ClearConfirmation {
    _private: (),
}

impl ClearConfirmation {
    /// Confirmation given up front, e.g. with `--yes`.
    pub fn from_flag(confirmed: bool) -> Option<Self> {
        confirmed.then_some(Self { _private: () })
    }

    /// Confirmation typed at a prompt. Must be exactly [`CONFIRMATION_PHRASE`].
    pub fn from_answer(answer: &str) -> Option<Self> {
        (answer.trim() == CONFIRMATION_PHRASE).then_some(Self { _private: () })
    }
}

pub struct PlaylistCleaner<'a, C: CatalogClient> {
    client: &'a C,
    retry: &'a RetryPolicy,
}

impl<'a, C: CatalogClient> PlaylistCleaner<'a, C> {
    pub fn new(client: &'a C, retry: &'a RetryPolicy) -> Self {
        Self { client, retry }
    }

    /// Every playlist owned by the authenticated user, fetched page by page.
    pub async fn owned_playlists(&self) -> Result<Vec<CatalogPlaylist>, CatalogError> {
        let mut playlists = Vec::new();
        let mut offset = Some(0);

        while let Some(current) = offset {
            let page = self
                .retry
                .run("list playlists", || {
                    self.client.owned_playlists(MAX_PLAYLIST_PAGE, current)
                })
                .await?;
            playlists.extend(page.playlists);
            offset = page.next_offset;
        }

        Ok(playlists)
    }

    /// Delete every owned playlist. Returns how many were removed.
    pub async fn clear_all(&self, _confirmation: ClearConfirmation) -> Result<usize> {
        let playlists = self
            .owned_playlists()
            .await
            .wrap_err("Failed to list owned playlists")?;

        for playlist in &playlists {
            self.retry
                .run("delete playlist", || self.client.delete_playlist(&playlist.id))
                .await
                .wrap_err_with(|| {
                    format!("Failed to delete playlist '{}' ({})", playlist.name, playlist.id)
                })?;
            log::info!("Deleted playlist '{}' ({})", playlist.name, playlist.id);
        }

        log::info!("All {} playlists deleted", playlists.len());
        Ok(playlists.len())
    }
}
