mod config;
mod itunes;
mod logging;
mod ports;
mod services;
mod spotify_rs;
#[cfg(test)]
mod test_utils;

use std::io::{BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::{
    Result,
    eyre::{Context, eyre},
};

use crate::{
    config::Config,
    itunes::{Library, load_library},
    logging::setup_logging,
    ports::catalog::CatalogClient,
    services::{
        maintenance::{CONFIRMATION_PHRASE, ClearConfirmation, PlaylistCleaner},
        matching::TieBreakKind,
        migration::{MigrationPolicy, PlaylistMigrator},
        retry::RetryPolicy,
        spotify::SpotifyCatalog,
    },
    spotify_rs::SpotifyClient,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The config file to use
    #[arg(short, long, env = "PLAYLIST_MIGRATOR_CONFIG")]
    config: Option<PathBuf>,

    /// Console log level (default: info)
    #[arg(long, default_value = "info", global = true, env = "LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// File log level (default: debug)
    #[arg(long, default_value = "debug", global = true)]
    log_file_level: log::LevelFilter,

    /// Path to log file
    #[arg(long, env = "PLAYLIST_MIGRATOR_LOG_FILE", global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

fn is_file(s: &str) -> Result<PathBuf, String> {
    let p: PathBuf = s.into();
    if p.is_file() {
        Ok(p)
    } else {
        Err(format!("`{}` is not an existing file", s))
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Recreate iTunes playlists in Spotify
    Migrate {
        /// The iTunes library export (overrides the config)
        #[arg(short, long, value_parser = is_file)]
        library: Option<PathBuf>,

        /// Additional playlist names to skip
        #[arg(short, long)]
        ignore: Vec<String>,

        /// Resolve every track but don't create anything
        #[arg(long)]
        dry_run: bool,

        /// Spotify OAuth access token
        #[arg(long, env = "SPOTIFY_ACCESS_TOKEN", hide_env_values = true)]
        access_token: Option<String>,

        /// How to pick between several matching tracks
        #[arg(long, value_enum)]
        tie_break: Option<TieBreakKind>,
    },
    /// Print what the library export contains, without contacting Spotify
    Inspect {
        /// The iTunes library export (overrides the config)
        #[arg(short, long, value_parser = is_file)]
        library: Option<PathBuf>,
    },
    /// Delete every playlist owned by the Spotify user
    ClearPlaylists {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,

        /// Spotify OAuth access token
        #[arg(long, env = "SPOTIFY_ACCESS_TOKEN", hide_env_values = true)]
        access_token: Option<String>,
    },
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Create a default config file, if it doesn't exist
    CreateDefault,
    /// Print the path to the config file
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    setup_logging(args.log_level, args.log_file.clone(), args.log_file_level)?;

    log::debug!("Playlist migrator starting");
    log::debug!("Loading configuration");

    let mut config = {
        if let Some(config) = args.config {
            Config::from_file(&config)
        } else {
            Config::load()
        }
    }
    .with_context(|| "Failed to load playlist-migrator config")?;

    match args.command {
        Commands::Migrate {
            library,
            ignore,
            dry_run,
            access_token,
            tie_break,
        } => {
            config.ignore_playlists(ignore);
            let library = read_library(&config, library)?;
            let catalog = spotify_catalog(&config, access_token)?;
            let retry = RetryPolicy::from(&config.retry);

            let owner_id = retry
                .run("current user", || catalog.current_user_id())
                .await
                .wrap_err("Failed to look up the Spotify user")?;
            log::info!("Creating playlists for Spotify user {}", owner_id);

            let policy = MigrationPolicy {
                dry_run,
                ..MigrationPolicy::from(&config.migration)
            };
            let tie_break = tie_break.unwrap_or(config.migration.tie_break);
            let migrator =
                PlaylistMigrator::new(catalog, retry, policy).with_tie_break(tie_break.build());

            let report = migrator.migrate(&library, &owner_id).await?;
            println!("{}", report);
        }
        Commands::Inspect { library } => {
            let library = read_library(&config, library)?;
            print_library(&library);
        }
        Commands::ClearPlaylists { yes, access_token } => {
            let confirmation = match ClearConfirmation::from_flag(yes) {
                Some(confirmation) => confirmation,
                None => match prompt_confirmation()? {
                    Some(confirmation) => confirmation,
                    None => {
                        println!("Aborted, nothing was deleted");
                        return Ok(());
                    }
                },
            };

            let catalog = spotify_catalog(&config, access_token)?;
            let retry = RetryPolicy::from(&config.retry);
            let deleted = PlaylistCleaner::new(&catalog, &retry)
                .clear_all(confirmation)
                .await?;
            println!("Deleted {} playlists", deleted);
        }
        Commands::Config(config_commands) => match config_commands {
            ConfigCommands::CreateDefault => {
                log::debug!("Creating default config");
                let path = Config::create_default()?;
                println!("{}", path.display());
            }
            ConfigCommands::Path => match Config::config_path() {
                Some(path) => println!("{}", path.display()),
                None => println!("No default config path found"),
            },
        },
    }

    Ok(())
}

fn read_library(config: &Config, library: Option<PathBuf>) -> Result<Library> {
    let path = library
        .or_else(|| config.library_path())
        .ok_or(eyre!("No library given. Pass --library or set `library` in the config"))?;

    log::info!("Reading library from {}", path.display());
    let library = load_library(&path, &config.ignored_playlists())
        .wrap_err_with(|| format!("Failed to load library {}", path.display()))?;
    log::info!(
        "Loaded {} tracks and {} playlists",
        library.tracks().len(),
        library.playlists().len()
    );
    Ok(library)
}

fn spotify_catalog(config: &Config, access_token: Option<String>) -> Result<SpotifyCatalog> {
    let access_token = access_token
        .or_else(|| config.spotify.access_token.clone())
        .ok_or(eyre!(
            "No Spotify access token. Set SPOTIFY_ACCESS_TOKEN or `spotify.access_token`"
        ))?;

    let client = SpotifyClient::with_base_url(
        access_token,
        &config.spotify.api_base_url,
        config.spotify.request_timeout(),
    )
    .wrap_err("Failed to create Spotify client")?;

    let catalog = SpotifyCatalog::new(client, config.spotify.search_limit);
    Ok(match config.spotify.user_id.clone() {
        Some(user_id) => catalog.with_user_id(user_id),
        None => catalog,
    })
}

fn print_library(library: &Library) {
    println!("Tracks:    {}", library.tracks().len());
    println!("Playlists: {}", library.playlists().len());
    for playlist in library.playlists() {
        let missing = playlist
            .track_ids
            .iter()
            .filter(|id| library.track(id).is_none())
            .count();
        if missing > 0 {
            println!(
                "  {:>5}  {} ({} missing from library)",
                playlist.track_ids.len(),
                playlist.title,
                missing
            );
        } else {
            println!("  {:>5}  {}", playlist.track_ids.len(), playlist.title);
        }
    }
}

/// Ask for [`CONFIRMATION_PHRASE`] on stdin.
fn prompt_confirmation() -> Result<Option<ClearConfirmation>> {
    print!(
        "This deletes every playlist you own on Spotify. Type '{}' to continue: ",
        CONFIRMATION_PHRASE
    );
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut answer)
        .wrap_err("Failed to read confirmation")?;
    Ok(ClearConfirmation::from_answer(&answer))
}
