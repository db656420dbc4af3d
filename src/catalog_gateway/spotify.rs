//! Spotify Web API client using the client-credentials flow.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::fallback::fallback_features;
use super::models::{
    FeatureLookup, FeatureRecord, SpotifyArtist, SpotifyErrorBody, SpotifySearchResponse,
    SpotifyTokenResponse, SpotifyTrack, TrackSummary,
};
use super::{CatalogError, CatalogGateway, MAX_ARTIST_GENRES};

pub const DEFAULT_API_BASE_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Seconds shaved off the advertised token lifetime before refreshing.
const TOKEN_EXPIRY_MARGIN_SECS: u64 = 60;

/// Spotify caps search page size at 10 for client-credentials apps.
const MAX_SEARCH_LIMIT: usize = 10;

#[derive(Clone, Debug)]
pub struct SpotifySettings {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub api_base_url: String,
    pub token_url: String,
    pub timeout_sec: u64,
    pub market: String,
}

impl Default for SpotifySettings {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            timeout_sec: 5,
            market: "US".to_string(),
        }
    }
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// HTTP client for the Spotify Web API.
pub struct SpotifyClient {
    client: reqwest::Client,
    settings: SpotifySettings,
    token: Mutex<Option<CachedToken>>,
}

/// Strip whitespace and surrounding quotes, as found in hand-edited env files.
pub fn clean_credential(raw: &str) -> Option<String> {
    let cleaned = raw.trim().trim_matches('"').trim_matches('\'').trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

impl SpotifyClient {
    pub fn new(settings: SpotifySettings) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_sec))
            .build()?;

        let settings = SpotifySettings {
            client_id: settings.client_id.as_deref().and_then(clean_credential),
            client_secret: settings.client_secret.as_deref().and_then(clean_credential),
            api_base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            ..settings
        };

        Ok(Self {
            client,
            settings,
            token: Mutex::new(None),
        })
    }

    pub fn has_credentials(&self) -> bool {
        self.settings.client_id.is_some() && self.settings.client_secret.is_some()
    }

    pub fn api_base_url(&self) -> &str {
        &self.settings.api_base_url
    }

    /// Return a cached access token, fetching a new one when missing or expired.
    async fn access_token(&self) -> Result<String, CatalogError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        let client_id = self
            .settings
            .client_id
            .as_deref()
            .ok_or(CatalogError::MissingCredentials("SPOTIFY_CLIENT_ID"))?;
        let client_secret = self
            .settings
            .client_secret
            .as_deref()
            .ok_or(CatalogError::MissingCredentials("SPOTIFY_CLIENT_SECRET"))?;

        debug!("Requesting new Spotify access token");
        let response = self
            .client
            .post(&self.settings.token_url)
            .basic_auth(client_id, Some(client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 401 {
            return Err(CatalogError::Unauthorized);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CatalogError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let body: SpotifyTokenResponse = response
            .json()
            .await
            .map_err(|e| CatalogError::Decode(e.to_string()))?;

        let lifetime = body.expires_in.saturating_sub(TOKEN_EXPIRY_MARGIN_SECS);
        let value = body.access_token;
        *cached = Some(CachedToken {
            value: value.clone(),
            expires_at: Instant::now() + Duration::from_secs(lifetime),
        });
        Ok(value)
    }

    /// Authenticated GET against the API, decoding the JSON body.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, CatalogError> {
        let token = self.access_token().await?;
        let url = format!("{}/{}", self.settings.api_base_url, path.trim_start_matches('/'));

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Err(CatalogError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<SpotifyErrorBody>(&text)
                .ok()
                .and_then(|body| body.error)
                .and_then(|detail| detail.message)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| {
                    if text.is_empty() {
                        status.canonical_reason().unwrap_or("unknown error").to_string()
                    } else {
                        text
                    }
                });
            return Err(CatalogError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| CatalogError::Decode(e.to_string()))
    }
}

#[async_trait]
impl CatalogGateway for SpotifyClient {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<TrackSummary>, CatalogError> {
        let limit = limit.clamp(1, MAX_SEARCH_LIMIT);
        let response: SpotifySearchResponse = self
            .get_json(
                "/search",
                &[
                    ("q", query.to_string()),
                    ("type", "track".to_string()),
                    ("limit", limit.to_string()),
                    ("market", self.settings.market.clone()),
                ],
            )
            .await?;

        Ok(response
            .tracks
            .items
            .into_iter()
            .map(SpotifyTrack::into_summary)
            .collect())
    }

    async fn get_track(&self, id: &str) -> Result<Option<TrackSummary>, CatalogError> {
        match self.get_json::<SpotifyTrack>(&format!("/tracks/{}", id), &[]).await {
            Ok(track) => Ok(Some(track.into_summary())),
            Err(CatalogError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn get_features(&self, id: &str) -> FeatureLookup {
        let result = self
            .get_json::<Option<FeatureRecord>>(&format!("/audio-features/{}", id), &[])
            .await;
        match result {
            Ok(Some(record)) => FeatureLookup::Upstream(record),
            Ok(None) => {
                warn!("No audio features for track {}, using fallback", id);
                FeatureLookup::Fallback(fallback_features())
            }
            Err(err) => {
                warn!("Audio features for track {} unavailable ({}), using fallback", id, err);
                FeatureLookup::Fallback(fallback_features())
            }
        }
    }

    async fn get_artist_genres(&self, artist_id: &str) -> Vec<String> {
        if artist_id.is_empty() {
            return Vec::new();
        }
        match self
            .get_json::<SpotifyArtist>(&format!("/artists/{}", artist_id), &[])
            .await
        {
            Ok(artist) => artist.genres.into_iter().take(MAX_ARTIST_GENRES).collect(),
            Err(err) => {
                debug!("Genres for artist {} unavailable: {}", artist_id, err);
                Vec::new()
            }
        }
    }
}
