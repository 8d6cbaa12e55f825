//! Recreating local playlists in the remote catalog.

pub mod context;

use std::time::Instant;

use color_eyre::eyre::{Result, WrapErr};

use crate::config::MigrationConfig;
use crate::itunes::{Library, Playlist, Track};
use crate::ports::catalog::{CatalogClient, CatalogError, CatalogTrack, MAX_ITEMS_PER_ADD};
use crate::services::matching::{FirstCandidate, Resolution, TieBreak, TrackQuery, TrackResolver};
use crate::services::retry::RetryPolicy;

pub use context::{CachedResolution, MigrationContext, RunReport};

/// Playlists resolving fewer tracks than this are not created.
pub const MIN_PLAYLIST_SIZE: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPolicy {
    pub min_playlist_size: usize,
    /// Items per add call, capped at [`MAX_ITEMS_PER_ADD`].
    pub batch_size: usize,
    /// Resolve everything but create nothing.
    pub dry_run: bool,
}

impl Default for MigrationPolicy {
    fn default() -> Self {
        Self {
            min_playlist_size: MIN_PLAYLIST_SIZE,
            batch_size: MAX_ITEMS_PER_ADD,
            dry_run: false,
        }
    }
}

impl From<&MigrationConfig> for MigrationPolicy {
    fn from(config: &MigrationConfig) -> Self {
        Self {
            min_playlist_size: config.min_playlist_size,
            batch_size: config.batch_size,
            dry_run: false,
        }
    }
}

/// Classification of one resolved track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    NoMatch,
    Unique(String),
    /// Several candidates passed; `chosen` was picked by the tie-break.
    Ambiguous { chosen: String, candidates: usize },
}

impl MatchResult {
    pub fn classify(track: &Track, resolution: &Resolution, tie_break: &dyn TieBreak) -> Self {
        match resolution.matches.as_slice() {
            [] => {
                log::warn!(
                    "No match for '{}' by {} (query '{}'). Catalog returned: {}",
                    track.title,
                    track.artist.as_deref().unwrap_or("<unknown artist>"),
                    resolution.query,
                    describe_candidates(&resolution.candidates)
                );
                MatchResult::NoMatch
            }
            [only] => MatchResult::Unique(only.id.clone()),
            matches => {
                let chosen = tie_break
                    .choose(track, matches)
                    .unwrap_or(&matches[0]);
                log::warn!(
                    "Ambiguous matches for '{}' by {}: {}. Picked {} ({} tie-break)",
                    track.title,
                    track.artist.as_deref().unwrap_or("<unknown artist>"),
                    describe_candidates(matches),
                    chosen.id,
                    tie_break.name()
                );
                MatchResult::Ambiguous {
                    chosen: chosen.id.clone(),
                    candidates: matches.len(),
                }
            }
        }
    }
}

fn describe_candidates(candidates: &[CatalogTrack]) -> String {
    if candidates.is_empty() {
        return "nothing".to_string();
    }
    candidates
        .iter()
        .map(|candidate| {
            format!(
                "'{}' by {}",
                candidate.title,
                candidate.primary_artist().unwrap_or("<unknown artist>")
            )
        })
        .collect::<Vec<_>>()
        .join("; ")
}

pub struct PlaylistMigrator<C: CatalogClient> {
    client: C,
    retry: RetryPolicy,
    policy: MigrationPolicy,
    tie_break: Box<dyn TieBreak>,
}

impl<C: CatalogClient> PlaylistMigrator<C> {
    pub fn new(client: C, retry: RetryPolicy, policy: MigrationPolicy) -> Self {
        Self {
            client,
            retry,
            policy,
            tie_break: Box::new(FirstCandidate),
        }
    }

    pub fn with_tie_break(mut self, tie_break: Box<dyn TieBreak>) -> Self {
        self.tie_break = tie_break;
        self
    }

    /// Recreate every playlist of `library` under `owner_id`, one playlist at a time.
    ///
    /// Unmatched tracks and sparse playlists are logged and skipped. Catalog
    /// failures that survive the retry policy abort the run; a playlist that
    /// was already created is left as is.
    pub async fn migrate(&self, library: &Library, owner_id: &str) -> Result<RunReport> {
        let started = Instant::now();
        let mut context = MigrationContext::default();

        log::info!(
            "Migrating {} playlists{}",
            library.playlists().len(),
            if self.policy.dry_run { " (dry run)" } else { "" }
        );

        for playlist in library.playlists() {
            self.migrate_playlist(library, playlist, owner_id, &mut context)
                .await?;
        }

        log::debug!("Resolved {} distinct tracks", context.cache.len());
        let report = RunReport {
            stats: context.stats,
            elapsed: started.elapsed(),
            dry_run: self.policy.dry_run,
        };
        log::info!("{}", report);
        Ok(report)
    }

    /// Returns the remote playlist id when one was created.
    async fn migrate_playlist(
        &self,
        library: &Library,
        playlist: &Playlist,
        owner_id: &str,
        context: &mut MigrationContext,
    ) -> Result<Option<String>> {
        log::info!(
            "Migrating playlist '{}' ({} tracks)",
            playlist.title,
            playlist.track_ids.len()
        );

        let pending = self
            .resolve_playlist_tracks(library, playlist, context)
            .await
            .wrap_err_with(|| format!("Failed to resolve tracks of playlist '{}'", playlist.title))?;

        if pending.len() < self.policy.min_playlist_size {
            log::warn!(
                "Not creating playlist '{}': only {} of {} tracks matched (minimum {})",
                playlist.title,
                pending.len(),
                playlist.track_ids.len(),
                self.policy.min_playlist_size
            );
            context.stats.playlists_skipped += 1;
            return Ok(None);
        }

        if self.policy.dry_run {
            log::info!(
                "Would create playlist '{}' with {} tracks",
                playlist.title,
                pending.len()
            );
            context.stats.playlists_created += 1;
            return Ok(None);
        }

        let remote_id = self
            .retry
            .run("create playlist", || {
                self.client.create_playlist(owner_id, &playlist.title)
            })
            .await
            .wrap_err_with(|| format!("Failed to create playlist '{}'", playlist.title))?;
        log::info!("Created playlist '{}' ({})", playlist.title, remote_id);

        let batch_size = self.policy.batch_size.clamp(1, MAX_ITEMS_PER_ADD);
        for (index, batch) in pending.chunks(batch_size).enumerate() {
            self.retry
                .run("add items", || self.client.add_items(&remote_id, batch))
                .await
                .wrap_err_with(|| {
                    format!(
                        "Failed to add batch {} ({} tracks) to playlist '{}'",
                        index + 1,
                        batch.len(),
                        playlist.title
                    )
                })?;
            log::debug!(
                "Added batch {} ({} tracks) to '{}'",
                index + 1,
                batch.len(),
                playlist.title
            );
        }

        context.stats.playlists_created += 1;
        log::info!(
            "Added {} tracks to playlist '{}'",
            pending.len(),
            playlist.title
        );
        Ok(Some(remote_id))
    }

    /// Remote ids for the playlist's tracks, in playlist order. Each entry is
    /// looked up independently, so duplicates stay duplicated.
    async fn resolve_playlist_tracks(
        &self,
        library: &Library,
        playlist: &Playlist,
        context: &mut MigrationContext,
    ) -> Result<Vec<String>, CatalogError> {
        let mut pending = Vec::with_capacity(playlist.track_ids.len());

        for local_id in &playlist.track_ids {
            if let Some(cached) = context.cache.get(local_id) {
                context.stats.cache_hits += 1;
                if let CachedResolution::Matched(remote_id) = cached {
                    pending.push(remote_id.clone());
                }
                continue;
            }

            let Some(track) = library.track(local_id) else {
                log::warn!(
                    "Playlist '{}' references track #{} which is not in the library",
                    playlist.title,
                    local_id
                );
                context.stats.missing_from_library += 1;
                continue;
            };

            match self.resolve_track(track).await? {
                MatchResult::NoMatch => {
                    context.stats.no_match += 1;
                    context.cache.insert(local_id, CachedResolution::Unmatched);
                }
                MatchResult::Unique(remote_id) => {
                    context.stats.added += 1;
                    context
                        .cache
                        .insert(local_id, CachedResolution::Matched(remote_id.clone()));
                    pending.push(remote_id);
                }
                MatchResult::Ambiguous { chosen, .. } => {
                    context.stats.added += 1;
                    context.stats.ambiguous += 1;
                    context
                        .cache
                        .insert(local_id, CachedResolution::Matched(chosen.clone()));
                    pending.push(chosen);
                }
            }
        }

        Ok(pending)
    }

    async fn resolve_track(&self, track: &Track) -> Result<MatchResult, CatalogError> {
        let query = TrackQuery::from_track(track).without_album();
        let resolution = TrackResolver::new(&self.client, &self.retry)
            .resolve(&query)
            .await?;
        Ok(MatchResult::classify(track, &resolution, self.tie_break.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::itunes::parser::parse_library;
    use crate::ports::catalog::MockCatalogClient;
    use crate::services::matching::tie_break::PreferAlbum;
    use crate::test_utils::{LibraryXmlBuilder, catalog_track};

    /// Tracks "1".."=track_count" titled "Song N" by "Artist".
    fn library(track_count: usize, playlists: &[(&str, &str, Vec<usize>)]) -> Library {
        let mut builder = LibraryXmlBuilder::new();
        for n in 1..=track_count {
            builder = builder.track(
                &n.to_string(),
                &format!("Song {}", n),
                Some("Artist"),
                Some("Album"),
            );
        }
        for (id, title, members) in playlists {
            let ids: Vec<String> = members.iter().map(ToString::to_string).collect();
            let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
            builder = builder.playlist(id, title, &ids);
        }
        parse_library(&builder.build(), &HashSet::new()).unwrap()
    }

    /// Every "Song N" resolves uniquely to "sp-N".
    fn matching_search(client: &mut MockCatalogClient) {
        client.expect_search_tracks().returning(|query| {
            let n = query.trim_start_matches("Song ");
            Ok(vec![catalog_track(&format!("sp-{}", n), query, "Artist", "Album")])
        });
    }

    fn record_batches(client: &mut MockCatalogClient) -> Arc<Mutex<Vec<Vec<String>>>> {
        let batches = Arc::new(Mutex::new(Vec::new()));
        let recorded = batches.clone();
        client.expect_add_items().returning(move |_, ids| {
            recorded.lock().unwrap().push(ids.to_vec());
            Ok(())
        });
        batches
    }

    fn migrator(client: MockCatalogClient) -> PlaylistMigrator<MockCatalogClient> {
        PlaylistMigrator::new(client, RetryPolicy::none(), MigrationPolicy::default())
    }

    #[tokio::test]
    async fn test_playlist_below_threshold_is_not_created() {
        let library = library(14, &[("100", "Sparse", (1..=14).collect())]);
        let mut client = MockCatalogClient::new();
        matching_search(&mut client);
        client.expect_create_playlist().times(0);
        client.expect_add_items().times(0);

        let report = migrator(client).migrate(&library, "owner").await.unwrap();

        assert_eq!(report.stats.added, 14);
        assert_eq!(report.stats.playlists_skipped, 1);
        assert_eq!(report.stats.playlists_created, 0);
    }

    #[tokio::test]
    async fn test_playlist_at_threshold_is_created() {
        let library = library(15, &[("100", "Just Enough", (1..=15).collect())]);
        let mut client = MockCatalogClient::new();
        matching_search(&mut client);
        client
            .expect_create_playlist()
            .withf(|owner, title| owner == "owner" && title == "Just Enough")
            .times(1)
            .returning(|_, _| Ok("remote-1".to_string()));
        let batches = record_batches(&mut client);

        let report = migrator(client).migrate(&library, "owner").await.unwrap();

        assert_eq!(report.stats.playlists_created, 1);
        let batches = batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 15);
    }

    #[tokio::test]
    async fn test_large_playlist_is_added_in_ordered_batches() {
        let library = library(250, &[("100", "Everything", (1..=250).collect())]);
        let mut client = MockCatalogClient::new();
        matching_search(&mut client);
        client
            .expect_create_playlist()
            .times(1)
            .returning(|_, _| Ok("remote-1".to_string()));
        let batches = record_batches(&mut client);

        migrator(client).migrate(&library, "owner").await.unwrap();

        let batches = batches.lock().unwrap();
        let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![100, 100, 50]);
        let flattened: Vec<String> = batches.iter().flatten().cloned().collect();
        let expected: Vec<String> = (1..=250).map(|n| format!("sp-{}", n)).collect();
        assert_eq!(flattened, expected);
    }

    #[tokio::test]
    async fn test_repeated_tracks_are_searched_once() {
        // Track 1 appears twice in the first playlist and again in the second.
        let mut first: Vec<usize> = (1..=15).collect();
        first.push(1);
        let second: Vec<usize> = (1..=15).rev().collect();
        let library = library(15, &[("100", "A", first), ("101", "B", second)]);

        let mut client = MockCatalogClient::new();
        client
            .expect_search_tracks()
            .withf(|query| query == "Song 1")
            .times(1)
            .returning(|query| Ok(vec![catalog_track("sp-1", query, "Artist", "Album")]));
        client
            .expect_search_tracks()
            .withf(|query| query != "Song 1")
            .times(14)
            .returning(|query| {
                let n = query.trim_start_matches("Song ");
                Ok(vec![catalog_track(&format!("sp-{}", n), query, "Artist", "Album")])
            });
        client
            .expect_create_playlist()
            .times(2)
            .returning(|_, title| Ok(format!("remote-{}", title)));
        let batches = record_batches(&mut client);

        let report = migrator(client).migrate(&library, "owner").await.unwrap();

        assert_eq!(report.stats.added, 15);
        assert_eq!(report.stats.cache_hits, 16);
        let batches = batches.lock().unwrap();
        assert_eq!(batches[0].len(), 16);
        assert_eq!(batches[0].first(), Some(&"sp-1".to_string()));
        assert_eq!(batches[0].last(), Some(&"sp-1".to_string()));
        assert_eq!(batches[1].last(), Some(&"sp-1".to_string()));
    }

    #[tokio::test]
    async fn test_unmatched_tracks_are_not_searched_again() {
        let library = library(2, &[("100", "A", vec![1, 2, 1]), ("101", "B", vec![1])]);
        let mut client = MockCatalogClient::new();
        client
            .expect_search_tracks()
            .withf(|query| query == "Song 1")
            .times(1)
            .returning(|_| Ok(vec![catalog_track("x", "Song 1", "Someone Else", "Album")]));
        client
            .expect_search_tracks()
            .withf(|query| query == "Song 2")
            .times(1)
            .returning(|query| Ok(vec![catalog_track("sp-2", query, "Artist", "Album")]));

        let report = migrator(client).migrate(&library, "owner").await.unwrap();

        assert_eq!(report.stats.no_match, 1);
        assert_eq!(report.stats.added, 1);
        assert_eq!(report.stats.playlists_skipped, 2);
    }

    #[tokio::test]
    async fn test_end_to_end_partial_matches() {
        let library = library(20, &[("100", "Road Trip", (1..=20).collect())]);
        let mut client = MockCatalogClient::new();
        client.expect_search_tracks().times(20).returning(|query| {
            let n: usize = query.trim_start_matches("Song ").parse().unwrap();
            let artist = if n <= 16 { "Artist" } else { "Somebody Different" };
            Ok(vec![catalog_track(&format!("sp-{}", n), query, artist, "Album")])
        });
        client
            .expect_create_playlist()
            .withf(|_, title| title == "Road Trip")
            .times(1)
            .returning(|_, _| Ok("remote-road-trip".to_string()));
        let batches = Arc::new(Mutex::new(Vec::new()));
        let recorded = batches.clone();
        client
            .expect_add_items()
            .withf(|playlist_id, _| playlist_id == "remote-road-trip")
            .times(1)
            .returning(move |_, ids| {
                recorded.lock().unwrap().push(ids.to_vec());
                Ok(())
            });

        let report = migrator(client).migrate(&library, "owner").await.unwrap();

        assert_eq!(report.stats.no_match, 4);
        assert_eq!(report.stats.added, 16);
        assert_eq!(report.stats.ambiguous, 0);
        assert_eq!(report.stats.playlists_created, 1);
        let batches = batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 16);
    }

    #[tokio::test]
    async fn test_ambiguous_match_picks_first_and_is_counted() {
        let library = library(15, &[("100", "A", (1..=15).collect())]);
        let mut client = MockCatalogClient::new();
        client.expect_search_tracks().returning(|query| {
            let n = query.trim_start_matches("Song ");
            Ok(vec![
                catalog_track(&format!("first-{}", n), query, "Artist", "Compilation"),
                catalog_track(&format!("second-{}", n), query, "Artist", "Album"),
            ])
        });
        client
            .expect_create_playlist()
            .returning(|_, _| Ok("remote".to_string()));
        let batches = record_batches(&mut client);

        let report = migrator(client).migrate(&library, "owner").await.unwrap();

        assert_eq!(report.stats.ambiguous, 15);
        assert_eq!(report.stats.added, 15);
        assert!(batches.lock().unwrap()[0].iter().all(|id| id.starts_with("first-")));
    }

    #[tokio::test]
    async fn test_album_tie_break() {
        let library = library(15, &[("100", "A", (1..=15).collect())]);
        let mut client = MockCatalogClient::new();
        client.expect_search_tracks().returning(|query| {
            let n = query.trim_start_matches("Song ");
            Ok(vec![
                catalog_track(&format!("first-{}", n), query, "Artist", "Compilation"),
                catalog_track(&format!("second-{}", n), query, "Artist", "Album"),
            ])
        });
        client
            .expect_create_playlist()
            .returning(|_, _| Ok("remote".to_string()));
        let batches = record_batches(&mut client);

        migrator(client)
            .with_tie_break(Box::new(PreferAlbum))
            .migrate(&library, "owner")
            .await
            .unwrap();

        assert!(batches.lock().unwrap()[0].iter().all(|id| id.starts_with("second-")));
    }

    #[tokio::test]
    async fn test_dangling_references_are_counted() {
        let mut members: Vec<usize> = (1..=15).collect();
        members.push(99);
        let library = library(15, &[("100", "A", members)]);
        let mut client = MockCatalogClient::new();
        matching_search(&mut client);
        client
            .expect_create_playlist()
            .returning(|_, _| Ok("remote".to_string()));
        let batches = record_batches(&mut client);

        let report = migrator(client).migrate(&library, "owner").await.unwrap();

        assert_eq!(report.stats.missing_from_library, 1);
        assert_eq!(batches.lock().unwrap()[0].len(), 15);
    }

    #[tokio::test]
    async fn test_dry_run_creates_nothing() {
        let library = library(15, &[("100", "A", (1..=15).collect())]);
        let mut client = MockCatalogClient::new();
        matching_search(&mut client);
        client.expect_create_playlist().times(0);
        client.expect_add_items().times(0);
        let policy = MigrationPolicy {
            dry_run: true,
            ..MigrationPolicy::default()
        };

        let report = PlaylistMigrator::new(client, RetryPolicy::none(), policy)
            .migrate(&library, "owner")
            .await
            .unwrap();

        assert!(report.dry_run);
        assert_eq!(report.stats.added, 15);
        assert_eq!(report.stats.playlists_created, 1);
    }

    #[tokio::test]
    async fn test_add_failure_aborts_run() {
        let library = library(15, &[("100", "A", (1..=15).collect()), ("101", "B", (1..=15).collect())]);
        let mut client = MockCatalogClient::new();
        matching_search(&mut client);
        client
            .expect_create_playlist()
            .times(1)
            .returning(|_, _| Ok("remote".to_string()));
        client.expect_add_items().times(1).returning(|_, _| {
            Err(CatalogError::Api {
                status: 400,
                message: "Invalid track uri".into(),
            })
        });

        let err = migrator(client).migrate(&library, "owner").await.unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid track uri"));
    }

    #[tokio::test]
    async fn test_stats_accumulate_across_playlists() {
        let library = library(
            30,
            &[("100", "A", (1..=15).collect()), ("101", "B", (16..=30).collect())],
        );
        let mut client = MockCatalogClient::new();
        matching_search(&mut client);
        client
            .expect_create_playlist()
            .times(2)
            .returning(|_, title| Ok(format!("remote-{}", title)));
        record_batches(&mut client);

        let report = migrator(client).migrate(&library, "owner").await.unwrap();

        assert_eq!(report.stats.added, 30);
        assert_eq!(report.stats.playlists_created, 2);
    }
}
