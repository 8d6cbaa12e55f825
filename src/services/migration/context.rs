use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::time::Duration;

/// What a local track resolved to during this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedResolution {
    Matched(String),
    /// Searched and nothing passed the filters. Not searched again this run.
    Unmatched,
}

/// Local track id -> resolution, for the lifetime of one migration run.
///
/// The first resolution recorded for an id is final.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: HashMap<String, CachedResolution>,
}

impl ResolutionCache {
    pub fn get(&self, local_id: &str) -> Option<&CachedResolution> {
        self.entries.get(local_id)
    }

    /// Record a resolution unless one is already present, returning the stored value.
    pub fn insert(&mut self, local_id: &str, resolution: CachedResolution) -> &CachedResolution {
        match self.entries.entry(local_id.to_string()) {
            Entry::Occupied(existing) => existing.into_mut(),
            Entry::Vacant(slot) => slot.insert(resolution),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Counters accumulated across every playlist of a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStatistics {
    /// Distinct local tracks with no acceptable catalog match.
    pub no_match: usize,
    /// Distinct local tracks with more than one acceptable match.
    pub ambiguous: usize,
    /// Distinct local tracks resolved to a catalog track.
    pub added: usize,
    /// Playlist entries pointing at a track id absent from the library.
    pub missing_from_library: usize,
    /// Playlist entries answered from the resolution cache.
    pub cache_hits: usize,
    pub playlists_created: usize,
    /// Playlists left out because too few of their tracks resolved.
    pub playlists_skipped: usize,
}

/// Mutable state owned by one migration run.
#[derive(Debug, Default)]
pub struct MigrationContext {
    pub cache: ResolutionCache,
    pub stats: RunStatistics,
}

/// Summary reported at the end of a run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub stats: RunStatistics,
    pub elapsed: Duration,
    pub dry_run: bool,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Millisecond precision is plenty for a run summary.
        let elapsed = Duration::from_millis(self.elapsed.as_millis() as u64);
        writeln!(
            f,
            "Migration {}in {}",
            if self.dry_run { "dry run finished " } else { "finished " },
            humantime::format_duration(elapsed)
        )?;
        writeln!(f, "  tracks added:         {}", self.stats.added)?;
        writeln!(f, "  tracks with no match: {}", self.stats.no_match)?;
        writeln!(f, "  ambiguous matches:    {}", self.stats.ambiguous)?;
        writeln!(f, "  missing from library: {}", self.stats.missing_from_library)?;
        writeln!(f, "  cache hits:           {}", self.stats.cache_hits)?;
        writeln!(f, "  playlists created:    {}", self.stats.playlists_created)?;
        write!(f, "  playlists skipped:    {}", self.stats.playlists_skipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_resolution_wins() {
        let mut cache = ResolutionCache::default();
        assert_eq!(cache.len(), 0);

        cache.insert("1", CachedResolution::Matched("spotify-a".into()));
        let stored = cache.insert("1", CachedResolution::Matched("spotify-b".into()));

        assert_eq!(stored, &CachedResolution::Matched("spotify-a".into()));
        assert_eq!(cache.get("1"), Some(&CachedResolution::Matched("spotify-a".into())));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_unmatched_is_cached() {
        let mut cache = ResolutionCache::default();
        cache.insert("2", CachedResolution::Unmatched);
        assert_eq!(cache.get("2"), Some(&CachedResolution::Unmatched));
        assert!(cache.get("3").is_none());
    }

    #[test]
    fn test_report_display() {
        let report = RunReport {
            stats: RunStatistics {
                no_match: 4,
                added: 16,
                playlists_created: 1,
                ..RunStatistics::default()
            },
            elapsed: Duration::from_millis(2500),
            dry_run: false,
        };

        let text = report.to_string();
        assert!(text.starts_with("Migration finished in 2s 500ms"));
        assert!(text.contains("tracks added:         16"));
        assert!(text.contains("tracks with no match: 4"));
    }
}
