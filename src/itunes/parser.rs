use std::collections::{HashMap, HashSet};
use std::path::Path;

use roxmltree::{Document, Node, ParsingOptions};

use super::error::{LibraryError, RecordKind};
use super::plist::PlistRecord;
use super::{Library, Playlist, Track};

const TRACKS: &str = "Tracks";
const PLAYLISTS: &str = "Playlists";
const TRACK_ID: &str = "Track ID";
const NAME: &str = "Name";
const ARTIST: &str = "Artist";
const ALBUM: &str = "Album";
const PLAYLIST_ID: &str = "Playlist ID";
const PLAYLIST_ITEMS: &str = "Playlist Items";
const FOLDER: &str = "Folder";

/// Read and parse a library export from disk.
pub fn load_library(path: &Path, ignored: &HashSet<String>) -> Result<Library, LibraryError> {
    log::debug!("Reading library export: {}", path.display());
    let contents = std::fs::read_to_string(path).map_err(|source| LibraryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_library(&contents, ignored)
}

/// Parse a library export.
///
/// Folders and playlists whose title is in `ignored` are left out of the result.
/// A record missing a required key fails the whole parse.
pub fn parse_library(document: &str, ignored: &HashSet<String>) -> Result<Library, LibraryError> {
    // iTunes exports carry a plist DOCTYPE.
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let doc = Document::parse_with_options(document, options)?;

    let root = doc.root_element();
    let top = if root.tag_name().name() == "plist" {
        root.children()
            .find(Node::is_element)
            .ok_or_else(|| LibraryError::Malformed {
                record: RecordKind::Library,
                context: "<plist>".to_string(),
                reason: "no top-level <dict>".to_string(),
            })?
    } else {
        root
    };
    let top = PlistRecord::from_dict(RecordKind::Library, top)?;

    let tracks_node = top
        .dict(TRACKS)
        .ok_or(LibraryError::MissingSection(TRACKS))?;
    let playlists_node = top
        .array(PLAYLISTS)
        .ok_or(LibraryError::MissingSection(PLAYLISTS))?;

    let tracks = parse_tracks(tracks_node)?;

    let mut playlists = Vec::new();
    let mut playlist_ids = HashSet::new();
    for node in playlists_node.children().filter(Node::is_element) {
        let Some(playlist) = parse_playlist(node, ignored)? else {
            continue;
        };
        if !playlist_ids.insert(playlist.id.clone()) {
            return Err(LibraryError::DuplicateId {
                record: RecordKind::Playlist,
                id: playlist.id,
            });
        }
        playlists.push(playlist);
    }

    log::info!(
        "Parsed library with {} tracks and {} playlists",
        tracks.len(),
        playlists.len()
    );

    Ok(Library::new(tracks, playlists))
}

fn parse_tracks(node: Node) -> Result<HashMap<String, Track>, LibraryError> {
    // The Tracks dict is keyed by track id; the authoritative id is the one
    // inside each track record.
    let collection = PlistRecord::from_dict(RecordKind::Library, node)?;

    let mut tracks = HashMap::new();
    for value in collection.values() {
        let track = parse_track(value)?;
        if tracks.contains_key(&track.id) {
            return Err(LibraryError::DuplicateId {
                record: RecordKind::Track,
                id: track.id,
            });
        }
        tracks.insert(track.id.clone(), track);
    }
    Ok(tracks)
}

fn parse_track(node: Node) -> Result<Track, LibraryError> {
    let record = PlistRecord::from_dict(RecordKind::Track, node)?;

    let context = record
        .text(NAME)
        .map(|name| format!("'{}'", name))
        .unwrap_or_else(|| "<unnamed>".to_string());
    let id = record.require_text(TRACK_ID, &context)?.trim().to_string();
    let title = record.require_text(NAME, &format!("#{}", id))?.to_string();

    let artist = record.optional_text(ARTIST).map(str::to_string);
    if artist.is_none() {
        log::info!("Track #{} '{}' has no artist", id, title);
    }
    let album = record.optional_text(ALBUM).map(str::to_string);
    if album.is_none() {
        log::info!("Track #{} '{}' has no album", id, title);
    }

    Ok(Track {
        id,
        title,
        artist,
        album,
    })
}

fn parse_playlist(node: Node, ignored: &HashSet<String>) -> Result<Option<Playlist>, LibraryError> {
    let record = PlistRecord::from_dict(RecordKind::Playlist, node)?;

    let title = record.require_text(NAME, "<unnamed>")?;
    let id = record
        .require_text(PLAYLIST_ID, &format!("'{}'", title))?
        .trim()
        .to_string();

    if ignored.contains(title) {
        log::debug!("Skipping ignored playlist '{}'", title);
        return Ok(None);
    }
    // Presence marks a folder, whatever its value.
    if record.contains(FOLDER) {
        log::warn!("Ignoring folder '{}'", title);
        return Ok(None);
    }

    let mut track_ids = Vec::new();
    if let Some(items) = record.array(PLAYLIST_ITEMS) {
        let context = format!("in playlist '{}'", title);
        for item in items.children().filter(Node::is_element) {
            let item = PlistRecord::from_dict(RecordKind::PlaylistItem, item)?;
            track_ids.push(item.require_text(TRACK_ID, &context)?.trim().to_string());
        }
    }

    Ok(Some(Playlist {
        id,
        title: title.to_string(),
        track_ids,
    }))
}
