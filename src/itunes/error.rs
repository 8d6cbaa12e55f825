use std::fmt;
use std::path::PathBuf;

/// Which kind of plist record a structural error was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Library,
    Track,
    Playlist,
    PlaylistItem,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordKind::Library => "Library",
            RecordKind::Track => "Track",
            RecordKind::Playlist => "Playlist",
            RecordKind::PlaylistItem => "Playlist item",
        };
        f.write_str(name)
    }
}

/// Structural failures while reading an iTunes library export.
///
/// All of these abort the run: they mean the export does not look the way
/// the parser expects, and guessing past them would silently corrupt playlists.
#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("Failed to read library file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse library XML: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("Library is missing the '{0}' section")]
    MissingSection(&'static str),
    #[error("{record} record {context} is missing required key '{key}'")]
    MissingAttribute {
        record: RecordKind,
        key: &'static str,
        context: String,
    },
    #[error("{record} record {context} is malformed: {reason}")]
    Malformed {
        record: RecordKind,
        context: String,
        reason: String,
    },
    #[error("Duplicate {record} id '{id}'")]
    DuplicateId { record: RecordKind, id: String },
}
