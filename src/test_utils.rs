use crate::ports::catalog::CatalogTrack;

const HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple Computer//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
	<key>Major Version</key><integer>1</integer>
	<key>Minor Version</key><integer>1</integer>
	<key>Application Version</key><string>12.8.2.3</string>
	<key>Music Folder</key><string>file:///Users/test/Music/iTunes/iTunes%20Media/</string>
"#;

/// Builds iTunes "Library.xml" fixtures.
#[derive(Debug, Default)]
pub struct LibraryXmlBuilder {
    tracks: Vec<String>,
    playlists: Vec<String>,
}

impl LibraryXmlBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A track laid out the way iTunes writes it, with unrelated keys in between.
    pub fn track(self, id: &str, title: &str, artist: Option<&str>, album: Option<&str>) -> Self {
        let mut entries = vec![
            integer("Track ID", id),
            integer("Size", "8421345"),
            integer("Total Time", "215000"),
            string("Kind", "MPEG audio file"),
            string("Name", title),
        ];
        if let Some(artist) = artist {
            entries.push(string("Artist", artist));
        }
        entries.push(integer("Year", "2005"));
        if let Some(album) = album {
            entries.push(string("Album", album));
        }
        entries.push(string("Persistent ID", &format!("PID{}", id)));
        self.raw_track(id, &entries)
    }

    /// A track record from pre-rendered `<key>`/value pairs.
    pub fn raw_track(mut self, key: &str, entries: &[String]) -> Self {
        self.tracks.push(format!(
            "\t\t<key>{}</key>\n\t\t<dict>{}</dict>\n",
            escape(key),
            entries.concat()
        ));
        self
    }

    pub fn playlist(self, id: &str, title: &str, track_ids: &[&str]) -> Self {
        self.raw_playlist(&[
            string("Name", title),
            string("Description", ""),
            integer("Playlist ID", id),
            string("Playlist Persistent ID", &format!("PL{}", id)),
            flag("All Items"),
            items(track_ids),
        ])
    }

    pub fn folder(self, id: &str, title: &str) -> Self {
        self.raw_playlist(&[
            string("Name", title),
            integer("Playlist ID", id),
            string("Playlist Persistent ID", &format!("PL{}", id)),
            flag("All Items"),
            flag("Folder"),
        ])
    }

    /// A playlist record from pre-rendered `<key>`/value pairs.
    pub fn raw_playlist(mut self, entries: &[String]) -> Self {
        self.playlists
            .push(format!("\t\t<dict>{}</dict>\n", entries.concat()));
        self
    }

    pub fn build(&self) -> String {
        let mut xml = String::from(HEADER);
        xml.push_str("\t<key>Tracks</key>\n\t<dict>\n");
        for track in &self.tracks {
            xml.push_str(track);
        }
        xml.push_str("\t</dict>\n\t<key>Playlists</key>\n\t<array>\n");
        for playlist in &self.playlists {
            xml.push_str(playlist);
        }
        xml.push_str("\t</array>\n\t<key>Library Persistent ID</key><string>0123456789ABCDEF</string>\n</dict>\n</plist>\n");
        xml
    }
}

pub fn string(key: &str, value: &str) -> String {
    format!("<key>{}</key><string>{}</string>", escape(key), escape(value))
}

pub fn integer(key: &str, value: &str) -> String {
    format!("<key>{}</key><integer>{}</integer>", escape(key), escape(value))
}

pub fn flag(key: &str) -> String {
    format!("<key>{}</key><true/>", escape(key))
}

/// A "Playlist Items" entry referencing the given track ids.
pub fn items(track_ids: &[&str]) -> String {
    let refs: String = track_ids
        .iter()
        .map(|id| format!("<dict>{}</dict>", integer("Track ID", id)))
        .collect();
    format!("<key>Playlist Items</key><array>{}</array>", refs)
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn catalog_track(id: &str, title: &str, artist: &str, album: &str) -> CatalogTrack {
    CatalogTrack {
        id: id.to_string(),
        title: title.to_string(),
        artists: vec![artist.to_string()],
        album: album.to_string(),
    }
}
