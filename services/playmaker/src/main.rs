//!
//! src/main.rs  Oct 2nd, 2026
//!
//! Command line entry point. Wires clients from the environment and
//! prints results as JSON on stdout, logs go to stderr
//!

use std::sync::Arc;

use clap::{Parser, Subcommand};

use playmaker::cache::{CachedCatalog, ResponseCache};
use playmaker::catalog::SpotifyCatalog;
use playmaker::config::{self, AppConfig, HttpConfig};
use playmaker::errors::PlaymakerError;
use playmaker::events::{EventSink, PlaylistResponse};
use playmaker::fetch::{OpenAiClient, SpotifyClient};
use playmaker::logging;
use playmaker::persistent::Persistent;
use playmaker::pipeline::PlaylistPipeline;
use playmaker::provider::{CatalogResolver, PlaylistWriter};
use playmaker::publish::{attach_album_art, PlaylistPublisher};
use playmaker::suggest::OpenAiSuggestions;

#[derive(Parser, Debug)]
#[command(name = "playmaker", version, about = "Generate Spotify playlists from a mood or theme")]
struct Cli {
    #[command(subcommand)]
    command: Command
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a grouped playlist for a free text query
    Generate {
        query: String,
        /// Print progress events as JSON lines while generating
        #[arg(long)]
        stream: bool,
        /// Create the playlist in the token holder's account
        #[arg(long)]
        publish: bool,
        #[arg(long)]
        description: Option<String>
    },
    /// Search the catalog directly
    Search {
        query: String,
        #[arg(long, default_value_t = 10)]
        limit: u32
    },
    /// List playlists previously published by a user, with their tracks
    History {
        owner: String,
        #[arg(long, default_value_t = 20)]
        limit: i64,
        #[arg(long, default_value_t = 0)]
        offset: i64
    },
    /// Show one published playlist by its history hash
    Show {
        hash: String
    }
}

struct Clients {
    spotify: Arc<SpotifyCatalog>,
    catalog: Arc<dyn CatalogResolver>,
    suggestions: Arc<OpenAiSuggestions>
}

fn build_clients(cfgs: &AppConfig) -> Result<Clients, PlaymakerError> {
    let spotify = Arc::new(SpotifyCatalog::new(
        SpotifyClient::new(&cfgs.http, &cfgs.spotify)?,
        cfgs.http.retry.clone()
    ));
    let catalog: Arc<dyn CatalogResolver> = if cfgs.cache.enabled {
        let cache = Arc::new(ResponseCache::new(cfgs.cache.max_entries));
        Arc::new(CachedCatalog::new(spotify.clone(), cache, &cfgs.cache))
    } else {
        spotify.clone()
    };
    let suggestions = Arc::new(OpenAiSuggestions::new(
        OpenAiClient::new(&cfgs.http, &cfgs.openai)?,
        cfgs.http.retry.clone()
    ));
    Ok(Clients { spotify, catalog, suggestions })
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), PlaymakerError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn generate(
    cfgs: &AppConfig,
    query: &str,
    stream: bool,
    publish: bool,
    description: Option<&str>
) -> Result<(), PlaymakerError> {
    let clients = build_clients(cfgs)?;
    let pipeline = PlaylistPipeline::new(
        clients.suggestions.clone(),
        clients.catalog.clone(),
        cfgs.pipeline.clone()
    );

    let result = if stream {
        let (sink, mut rx) = EventSink::channel();
        let printer = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Ok(line) = serde_json::to_string(&event) {
                    println!("{line}");
                }
            }
        });
        let result = pipeline.generate_with_events(query, &sink).await;
        drop(sink);
        let _ = printer.await;
        result?
    } else {
        let result = pipeline.generate(query).await?;
        print_json(&PlaylistResponse::from(&result))?;
        result
    };

    if publish {
        let history = Arc::new(Persistent::init(&cfgs.persistence.db_url).await?);
        let writer: Arc<dyn PlaylistWriter> = clients.spotify.clone();
        let publisher = PlaylistPublisher::new(writer, clients.catalog, Some(history));
        let published = publisher
            .publish(&result.name, description, &result.primary_ids())
            .await?;
        print_json(&published)?;
    }
    Ok(())
}

async fn search(cfgs: &AppConfig, query: &str, limit: u32) -> Result<(), PlaymakerError> {
    let clients = build_clients(cfgs)?;
    let tracks = clients.catalog.search(query, limit).await?;
    print_json(&tracks)
}

/// Artwork needs only Spotify credentials; without them entries are
/// listed without it
async fn with_album_art(entries: &mut [playmaker::persistent::HistoryEntry]) {
    let catalog = match config::load_spotify_config()
        .and_then(|cfg| SpotifyClient::new(&HttpConfig::default(), &cfg)) {
        Ok(client) => SpotifyCatalog::new(client, HttpConfig::default().retry),
        Err(e) => {
            tracing::debug!(error = %e, "history.album_art.skipped");
            return;
        }
    };
    attach_album_art(&catalog, entries).await;
}

async fn history(owner: &str, limit: i64, offset: i64) -> Result<(), PlaymakerError> {
    let persistence = config::load_persistence_config();
    let store = Persistent::init(&persistence.db_url).await?;
    let mut entries = store.get_user_playlists_with_tracks(owner, limit, offset).await?;
    with_album_art(&mut entries).await;
    print_json(&entries)
}

async fn show(hash: &str) -> Result<(), PlaymakerError> {
    let persistence = config::load_persistence_config();
    let store = Persistent::init(&persistence.db_url).await?;
    let Some(entry) = store.get_playlist_entry(hash).await? else {
        return Err(PlaymakerError::Config(format!("no playlist with hash {hash}")));
    };
    let mut entries = [entry];
    with_album_art(&mut entries).await;
    print_json(&entries[0])
}

#[tokio::main]
async fn main() -> Result<(), PlaymakerError> {
    let cli = Cli::parse();
    let _guard = logging::init_logging(&config::load_logging_config())?;

    tracing::info!(
        service="playmaker",
        version=%env!("CARGO_PKG_VERSION"),
        "starting"
    );

    match cli.command {
        Command::Generate { query, stream, publish, description } => {
            let cfgs = config::load_config()?;
            generate(&cfgs, &query, stream, publish, description.as_deref()).await
        }
        Command::Search { query, limit } => {
            let cfgs = config::load_config()?;
            search(&cfgs, &query, limit).await
        }
        Command::History { owner, limit, offset } => history(&owner, limit, offset).await,
        Command::Show { hash } => show(&hash).await
    }
}
