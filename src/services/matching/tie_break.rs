use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::itunes::Track;
use crate::ports::catalog::CatalogTrack;

/// Picks one catalog track when several pass every match filter.
pub trait TieBreak: Send + Sync {
    fn name(&self) -> &'static str;

    /// `matches` is in catalog order. Returns `None` only when it is empty.
    fn choose<'a>(&self, track: &Track, matches: &'a [CatalogTrack]) -> Option<&'a CatalogTrack>;
}

/// Take whatever the catalog ranked first.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstCandidate;

impl TieBreak for FirstCandidate {
    fn name(&self) -> &'static str {
        "first"
    }

    fn choose<'a>(&self, _track: &Track, matches: &'a [CatalogTrack]) -> Option<&'a CatalogTrack> {
        matches.first()
    }
}

/// Take the first candidate from the same album as the local track, falling
/// back to the first candidate.
#[derive(Debug, Default, Clone, Copy)]
pub struct PreferAlbum;

impl TieBreak for PreferAlbum {
    fn name(&self) -> &'static str {
        "album"
    }

    fn choose<'a>(&self, track: &Track, matches: &'a [CatalogTrack]) -> Option<&'a CatalogTrack> {
        let same_album = track.album.as_deref().and_then(|album| {
            let album = album.to_lowercase();
            matches
                .iter()
                .find(|candidate| candidate.album.to_lowercase() == album)
        });
        same_album.or_else(|| matches.first())
    }
}

/// Tie-break selection as it appears in config files and on the command line.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TieBreakKind {
    #[default]
    First,
    Album,
}

impl TieBreakKind {
    pub fn build(self) -> Box<dyn TieBreak> {
        match self {
            TieBreakKind::First => Box::new(FirstCandidate),
            TieBreakKind::Album => Box::new(PreferAlbum),
        }
    }
}
