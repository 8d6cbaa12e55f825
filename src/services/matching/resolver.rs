use crate::itunes::Track;
use crate::ports::catalog::{CatalogClient, CatalogError, CatalogTrack};
use crate::services::retry::RetryPolicy;

use super::normalize::normalize_title;

/// Local metadata used to look a track up in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackQuery<'a> {
    pub title: &'a str,
    pub artist: Option<&'a str>,
    pub album: Option<&'a str>,
}

impl<'a> TrackQuery<'a> {
    pub fn from_track(track: &'a Track) -> Self {
        Self {
            title: &track.title,
            artist: track.artist.as_deref(),
            album: track.album.as_deref(),
        }
    }

    /// Catalog album naming drifts too much to be a reliable filter.
    pub fn without_album(self) -> Self {
        Self {
            album: None,
            ..self
        }
    }
}

/// Outcome of one catalog search.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Cleaned title that was sent as the search query.
    pub query: String,
    /// Everything the catalog returned, in catalog order.
    pub candidates: Vec<CatalogTrack>,
    /// Candidates that passed every filter, in catalog order.
    pub matches: Vec<CatalogTrack>,
}

pub struct TrackResolver<'a, C: CatalogClient> {
    client: &'a C,
    retry: &'a RetryPolicy,
}

impl<'a, C: CatalogClient> TrackResolver<'a, C> {
    pub fn new(client: &'a C, retry: &'a RetryPolicy) -> Self {
        Self { client, retry }
    }

    /// Search the catalog by cleaned title and keep the candidates whose
    /// title, artist and album agree with `query`.
    pub async fn resolve(&self, query: &TrackQuery<'_>) -> Result<Resolution, CatalogError> {
        let cleaned = normalize_title(query.title);
        if cleaned.is_empty() {
            log::warn!(
                "Title '{}' is empty after cleanup, not searching",
                query.title
            );
            return Ok(Resolution::default());
        }

        log::info!(
            "Searching for '{}' by {}",
            cleaned,
            query.artist.unwrap_or("<unknown artist>")
        );
        let candidates = self
            .retry
            .run("search", || self.client.search_tracks(&cleaned))
            .await?;

        let matches: Vec<CatalogTrack> = candidates
            .iter()
            .filter(|candidate| candidate_matches(&cleaned, query, candidate))
            .cloned()
            .collect();

        for found in &matches {
            log::debug!(
                "\tFound '{}' by {} on album {} with ID = {}",
                found.title,
                found.primary_artist().unwrap_or("<unknown artist>"),
                found.album,
                found.id
            );
        }

        Ok(Resolution {
            query: cleaned,
            candidates,
            matches,
        })
    }
}

/// Filters applied in order: title, then artist, then album.
/// `cleaned_title` is the normalized form of `query.title`.
pub fn candidate_matches(cleaned_title: &str, query: &TrackQuery<'_>, candidate: &CatalogTrack) -> bool {
    if !eq_ignore_case(&normalize_title(&candidate.title), cleaned_title) {
        return false;
    }

    if let Some(artist) = query.artist {
        match candidate.primary_artist() {
            Some(candidate_artist) if artist_matches(artist, candidate_artist) => {}
            _ => return false,
        }
    }

    if let Some(album) = query.album {
        if !eq_ignore_case(album, &candidate.album) {
            return false;
        }
    }

    true
}

/// Case-insensitive equality or containment in either direction, so
/// "Gorillaz" accepts "Gorillaz feat. De La Soul". Blank names never match.
pub fn artist_matches(wanted: &str, candidate: &str) -> bool {
    let wanted = wanted.trim().to_lowercase();
    let candidate = candidate.trim().to_lowercase();
    if wanted.is_empty() || candidate.is_empty() {
        return false;
    }
    wanted == candidate || candidate.contains(&wanted) || wanted.contains(&candidate)
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}
