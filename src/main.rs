use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gago_server::config::{AppConfig, CliConfig, FileConfig};
use gago_server::{run_server, CatalogGateway, RequestsLoggingLevel, SpotifyClient, TrackCache};

#[derive(Parser, Debug)]
struct CliArgs {
    /// Optional TOML config file. Its values override the command line.
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// The address to bind to.
    #[clap(long, default_value = "0.0.0.0")]
    pub host: String,

    /// The port to listen on.
    #[clap(short, long, env = "PORT", default_value_t = 8888)]
    pub port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    /// Origin allowed to call the API from a browser. Can be repeated.
    #[clap(
        long = "allowed-origin",
        default_values = ["http://localhost:3000", "http://127.0.0.1:3000"]
    )]
    pub allowed_origins: Vec<String>,

    /// Spotify application client id.
    #[clap(long, env = "SPOTIFY_CLIENT_ID", hide_env_values = true)]
    pub spotify_client_id: Option<String>,

    /// Spotify application client secret.
    #[clap(long, env = "SPOTIFY_CLIENT_SECRET", hide_env_values = true)]
    pub spotify_client_secret: Option<String>,

    /// Timeout in seconds for every Spotify request.
    #[clap(long, default_value_t = 5)]
    pub upstream_timeout_sec: u64,

    /// Market used to filter search results.
    #[clap(long, default_value = "US")]
    pub market: String,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            host: self.host.clone(),
            port: self.port,
            logging_level: self.logging_level.clone(),
            frontend_dir_path: self.frontend_dir_path.clone(),
            allowed_origins: self.allowed_origins.clone(),
            spotify_client_id: self.spotify_client_id.clone(),
            spotify_client_secret: self.spotify_client_secret.clone(),
            upstream_timeout_sec: self.upstream_timeout_sec,
            market: self.market.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match cli_args.config.as_deref() {
        Some(path) => {
            info!("Loading config file {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    if !config.has_spotify_credentials() {
        warn!(
            "Spotify credentials not set. Set SPOTIFY_CLIENT_ID and SPOTIFY_CLIENT_SECRET; \
             search and track lookups will fail until then."
        );
    }

    let spotify = SpotifyClient::new(config.spotify.clone())
        .context("Failed to build Spotify client")?;
    info!(
        "Using Spotify API at {} (market {}, timeout {}s)",
        spotify.api_base_url(),
        config.spotify.market,
        config.spotify.timeout_sec
    );
    let gateway: Arc<dyn CatalogGateway> = Arc::new(spotify);

    info!("Ready to serve at {}:{}!", config.host, config.port);
    run_server(config.server_config(), gateway, TrackCache::new_guarded()).await
}
