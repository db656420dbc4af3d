mod file_config;

pub use file_config::{FileConfig, SpotifyConfig};

use crate::catalog_gateway::spotify::{clean_credential, DEFAULT_API_BASE_URL, DEFAULT_TOKEN_URL};
use crate::catalog_gateway::SpotifySettings;
use crate::server::{RequestsLoggingLevel, ServerConfig};
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::Path;

/// Longest upstream timeout accepted, in seconds.
pub const MAX_UPSTREAM_TIMEOUT_SEC: u64 = 60;

/// CLI arguments that can be used for config resolution.
/// The TOML config overrides any of these when present.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub host: String,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub allowed_origins: Vec<String>,
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,
    pub upstream_timeout_sec: u64,
    pub market: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        let server = ServerConfig::default();
        let spotify = SpotifySettings::default();
        CliConfig {
            host: server.host,
            port: server.port,
            logging_level: server.requests_logging_level,
            frontend_dir_path: None,
            allowed_origins: server.allowed_origins,
            spotify_client_id: None,
            spotify_client_secret: None,
            upstream_timeout_sec: spotify.timeout_sec,
            market: spotify.market,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub allowed_origins: Vec<String>,
    pub spotify: SpotifySettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();
        let spotify_file = file.spotify.unwrap_or_default();

        let host = file.host.unwrap_or_else(|| cli.host.clone());
        let port = file.port.unwrap_or(cli.port);

        let logging_level = match file.logging_level {
            Some(raw) => match parse_logging_level(&raw) {
                Some(level) => level,
                None => bail!("Invalid logging_level in config file: {:?}", raw),
            },
            None => cli.logging_level.clone(),
        };

        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());
        if let Some(dir) = frontend_dir_path.as_deref() {
            let path = Path::new(dir);
            if !path.exists() {
                bail!("Frontend directory does not exist: {:?}", path);
            }
            if !path.is_dir() {
                bail!("frontend_dir_path is not a directory: {:?}", path);
            }
        }

        let allowed_origins = file
            .allowed_origins
            .unwrap_or_else(|| cli.allowed_origins.clone());

        let timeout_sec = file.upstream_timeout_sec.unwrap_or(cli.upstream_timeout_sec);
        if timeout_sec == 0 {
            bail!("upstream_timeout_sec must be greater than zero");
        }
        if timeout_sec > MAX_UPSTREAM_TIMEOUT_SEC {
            bail!(
                "upstream_timeout_sec must be at most {} seconds, got {}",
                MAX_UPSTREAM_TIMEOUT_SEC,
                timeout_sec
            );
        }

        let market = file.market.unwrap_or_else(|| cli.market.clone());
        if market.trim().is_empty() {
            bail!("market must not be empty");
        }

        let spotify = SpotifySettings {
            client_id: spotify_file
                .client_id
                .or_else(|| cli.spotify_client_id.clone())
                .and_then(|raw| clean_credential(&raw)),
            client_secret: spotify_file
                .client_secret
                .or_else(|| cli.spotify_client_secret.clone())
                .and_then(|raw| clean_credential(&raw)),
            api_base_url: spotify_file
                .api_base_url
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            token_url: spotify_file
                .token_url
                .unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
            timeout_sec,
            market: market.trim().to_string(),
        };

        Ok(Self {
            host,
            port,
            logging_level,
            frontend_dir_path,
            allowed_origins,
            spotify,
        })
    }

    pub fn has_spotify_credentials(&self) -> bool {
        self.spotify.client_id.is_some() && self.spotify.client_secret.is_some()
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            requests_logging_level: self.logging_level.clone(),
            host: self.host.clone(),
            port: self.port,
            frontend_dir_path: self.frontend_dir_path.clone(),
            allowed_origins: self.allowed_origins.clone(),
        }
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
