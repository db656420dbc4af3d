//! Test fixtures: an in-memory catalog gateway and a fake Spotify API
//!
//! Both serve the same five-track catalog described in `constants.rs`.

use super::constants::*;
use async_trait::async_trait;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use gago_server::catalog_gateway::{
    fallback_features, CatalogError, CatalogGateway, FeatureLookup, FeatureRecord,
    SpotifySettings, TrackSummary,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

fn summary(id: &str, name: &str, artist: &str, artist_id: &str, popularity: u32) -> TrackSummary {
    TrackSummary {
        id: id.to_string(),
        name: name.to_string(),
        artist: artist.to_string(),
        artist_id: artist_id.to_string(),
        popularity: Some(popularity),
        duration_ms: Some(200_000 + popularity as u64 * 1000),
    }
}

fn base_features() -> FeatureRecord {
    FeatureRecord {
        danceability: Some(0.8),
        energy: Some(0.6),
        key: Some(5),
        loudness: Some(-8.0),
        mode: Some(1),
        speechiness: Some(0.05),
        acousticness: Some(0.1),
        instrumentalness: Some(0.0),
        liveness: Some(0.12),
        valence: Some(0.7),
        tempo: Some(120.0),
        note: None,
    }
}

pub fn fixture_tracks() -> Vec<TrackSummary> {
    vec![
        summary(TRACK_A_ID, "Night Drive", NEON_TIDE, NEON_TIDE_ID, 70),
        summary(TRACK_B_ID, "Night Swim", NEON_TIDE, NEON_TIDE_ID, 60),
        summary(TRACK_C_ID, "Night Bus", GLASS_HARBOR, GLASS_HARBOR_ID, 50),
        summary(TRACK_D_ID, "Night Shift", IRON_CHOIR, IRON_CHOIR_ID, 40),
        summary(TRACK_E_ID, "Night Radio", PAPER_MOONS, PAPER_MOONS_ID, 30),
    ]
}

/// Upstream audio features. Track E has none.
pub fn fixture_features(id: &str) -> Option<FeatureRecord> {
    match id {
        TRACK_A_ID | TRACK_B_ID => Some(base_features()),
        TRACK_C_ID => Some(FeatureRecord {
            valence: Some(0.69),
            ..base_features()
        }),
        TRACK_D_ID => Some(FeatureRecord {
            danceability: Some(0.1),
            energy: Some(0.95),
            key: Some(0),
            loudness: Some(-2.0),
            mode: Some(0),
            speechiness: Some(0.4),
            acousticness: Some(0.9),
            instrumentalness: Some(0.8),
            liveness: Some(0.9),
            valence: Some(0.05),
            tempo: Some(190.0),
            note: None,
        }),
        _ => None,
    }
}

pub fn fixture_genres(artist_id: &str) -> Option<Vec<String>> {
    match artist_id {
        NEON_TIDE_ID => Some(NEON_TIDE_GENRES.iter().map(|g| g.to_string()).collect()),
        GLASS_HARBOR_ID => Some(vec!["indie rock".to_string()]),
        IRON_CHOIR_ID | PAPER_MOONS_ID => Some(Vec::new()),
        _ => None,
    }
}

fn matching_tracks(query: &str, limit: usize) -> Vec<TrackSummary> {
    let needle = query.to_lowercase();
    fixture_tracks()
        .into_iter()
        .filter(|t| t.name.to_lowercase().contains(&needle) || t.artist.to_lowercase().contains(&needle))
        .take(limit)
        .collect()
}

// ============================================================================
// In-memory gateway
// ============================================================================

/// Gateway backed by the fixture catalog, counting calls per method.
pub struct MockCatalogGateway {
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl MockCatalogGateway {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
        }
    }

    fn record_call(&self, method: &'static str) {
        *self.calls.lock().unwrap().entry(method).or_insert(0) += 1;
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.calls.lock().unwrap().get(method).copied().unwrap_or(0)
    }
}

#[async_trait]
impl CatalogGateway for MockCatalogGateway {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<TrackSummary>, CatalogError> {
        self.record_call("search");
        if query == FAILING_SEARCH_QUERY {
            return Err(CatalogError::Upstream {
                status: 503,
                message: "Service unavailable".to_string(),
            });
        }
        Ok(matching_tracks(query, limit))
    }

    async fn get_track(&self, id: &str) -> Result<Option<TrackSummary>, CatalogError> {
        self.record_call("get_track");
        Ok(fixture_tracks().into_iter().find(|t| t.id == id))
    }

    async fn get_features(&self, id: &str) -> FeatureLookup {
        self.record_call("get_features");
        match fixture_features(id) {
            Some(features) => FeatureLookup::Upstream(features),
            None => FeatureLookup::Fallback(fallback_features()),
        }
    }

    async fn get_artist_genres(&self, artist_id: &str) -> Vec<String> {
        self.record_call("get_artist_genres");
        fixture_genres(artist_id)
            .map(|genres| genres.into_iter().take(3).collect())
            .unwrap_or_default()
    }
}

// ============================================================================
// Fake Spotify Web API
// ============================================================================

#[derive(Default)]
struct FakeSpotifyState {
    token_requests: AtomicUsize,
    api_requests: AtomicUsize,
    last_search_params: Mutex<Option<HashMap<String, String>>>,
}

/// A local HTTP server speaking the subset of the Spotify Web API the
/// client uses. Shuts down when dropped.
pub struct FakeSpotify {
    pub base_url: String,
    state: Arc<FakeSpotifyState>,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

fn spotify_error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({ "error": { "status": status.as_u16(), "message": message } })),
    )
        .into_response()
}

fn spotify_track_json(track: &TrackSummary) -> Value {
    json!({
        "id": track.id,
        "name": track.name,
        "artists": [{ "id": track.artist_id, "name": track.artist }],
        "popularity": track.popularity,
        "duration_ms": track.duration_ms,
        "explicit": false,
    })
}

fn is_authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", FAKE_ACCESS_TOKEN))
        .unwrap_or(false)
}

async fn token(
    State(state): State<Arc<FakeSpotifyState>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    state.token_requests.fetch_add(1, Ordering::SeqCst);
    let basic = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("Basic "))
        .unwrap_or(false);
    if !basic {
        return spotify_error(StatusCode::UNAUTHORIZED, "Invalid client");
    }
    if !body.contains("grant_type=client_credentials") {
        return spotify_error(StatusCode::BAD_REQUEST, "unsupported_grant_type");
    }
    Json(json!({
        "access_token": FAKE_ACCESS_TOKEN,
        "token_type": "Bearer",
        "expires_in": 3600,
    }))
    .into_response()
}

async fn search(
    State(state): State<Arc<FakeSpotifyState>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.api_requests.fetch_add(1, Ordering::SeqCst);
    if !is_authorized(&headers) {
        return spotify_error(StatusCode::UNAUTHORIZED, "Invalid access token");
    }
    *state.last_search_params.lock().unwrap() = Some(params.clone());

    let query = params.get("q").cloned().unwrap_or_default();
    if query == FAILING_SEARCH_QUERY {
        return spotify_error(StatusCode::SERVICE_UNAVAILABLE, "Service unavailable");
    }
    let limit = params
        .get("limit")
        .and_then(|l| l.parse::<usize>().ok())
        .unwrap_or(20);
    let items: Vec<Value> = matching_tracks(&query, limit)
        .iter()
        .map(spotify_track_json)
        .collect();
    Json(json!({ "tracks": { "items": items, "total": items.len() } })).into_response()
}

async fn track(
    State(state): State<Arc<FakeSpotifyState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    state.api_requests.fetch_add(1, Ordering::SeqCst);
    if !is_authorized(&headers) {
        return spotify_error(StatusCode::UNAUTHORIZED, "Invalid access token");
    }
    match fixture_tracks().iter().find(|t| t.id == id) {
        Some(track) => Json(spotify_track_json(track)).into_response(),
        None => spotify_error(StatusCode::NOT_FOUND, "Non existing id"),
    }
}

async fn audio_features(
    State(state): State<Arc<FakeSpotifyState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    state.api_requests.fetch_add(1, Ordering::SeqCst);
    if !is_authorized(&headers) {
        return spotify_error(StatusCode::UNAUTHORIZED, "Invalid access token");
    }
    match fixture_features(&id) {
        Some(features) => Json(features).into_response(),
        None => spotify_error(StatusCode::FORBIDDEN, "Forbidden"),
    }
}

async fn artist(
    State(state): State<Arc<FakeSpotifyState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    state.api_requests.fetch_add(1, Ordering::SeqCst);
    if !is_authorized(&headers) {
        return spotify_error(StatusCode::UNAUTHORIZED, "Invalid access token");
    }
    match fixture_genres(&id) {
        Some(genres) => Json(json!({ "id": id, "genres": genres })).into_response(),
        None => spotify_error(StatusCode::NOT_FOUND, "Non existing id"),
    }
}

impl FakeSpotify {
    pub async fn spawn() -> Self {
        let state = Arc::new(FakeSpotifyState::default());

        let app = Router::new()
            .route("/api/token", post(token))
            .route("/v1/search", get(search))
            .route("/v1/tracks/{id}", get(track))
            .route("/v1/audio-features/{id}", get(audio_features))
            .route("/v1/artists/{id}", get(artist))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake Spotify");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Fake Spotify failed");
        });

        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            state,
            _shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Client settings pointing at this server, with valid credentials.
    pub fn settings(&self) -> SpotifySettings {
        SpotifySettings {
            client_id: Some(FAKE_CLIENT_ID.to_string()),
            client_secret: Some(FAKE_CLIENT_SECRET.to_string()),
            api_base_url: format!("{}/v1", self.base_url),
            token_url: format!("{}/api/token", self.base_url),
            ..SpotifySettings::default()
        }
    }

    pub fn token_requests(&self) -> usize {
        self.state.token_requests.load(Ordering::SeqCst)
    }

    pub fn api_requests(&self) -> usize {
        self.state.api_requests.load(Ordering::SeqCst)
    }

    pub fn last_search_params(&self) -> Option<HashMap<String, String>> {
        self.state.last_search_params.lock().unwrap().clone()
    }
}

impl Drop for FakeSpotify {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
