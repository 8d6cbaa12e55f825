//! Reading iTunes / Music.app "Library.xml" exports.

pub mod error;
pub mod parser;
pub mod plist;

use std::collections::HashMap;

pub use parser::load_library;

/// A track from the local library export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    /// iTunes "Track ID", only stable within one export.
    pub id: String,
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
}

/// A regular (non-folder) playlist. Track ids keep export order, duplicates included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playlist {
    pub id: String,
    pub title: String,
    pub track_ids: Vec<String>,
}

/// Parsed library: tracks keyed by local id, playlists in export order.
#[derive(Debug, Default)]
pub struct Library {
    tracks: HashMap<String, Track>,
    playlists: Vec<Playlist>,
}

impl Library {
    pub fn new(tracks: HashMap<String, Track>, playlists: Vec<Playlist>) -> Self {
        Self { tracks, playlists }
    }

    pub fn track(&self, id: &str) -> Option<&Track> {
        self.tracks.get(id)
    }

    pub fn tracks(&self) -> &HashMap<String, Track> {
        &self.tracks
    }

    pub fn playlists(&self) -> &[Playlist] {
        &self.playlists
    }
}
