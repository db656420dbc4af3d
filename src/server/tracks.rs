//! Search, track details and similarity routes

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::catalog_gateway::{FeatureRecord, TrackSummary};
use crate::track_cache::TrackRecord;
use crate::track_service::{SimilarTrack, TrackService, TrackServiceError};

use super::state::ServerState;

pub const DEFAULT_RESULTS_LIMIT: usize = 10;

#[derive(Deserialize, Debug)]
struct SearchParams {
    pub q: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Deserialize, Debug)]
struct LimitParams {
    pub limit: Option<usize>,
}

fn effective_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(DEFAULT_RESULTS_LIMIT).max(1)
}

/// Error response with a JSON `{"detail": ...}` body.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    detail: String,
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl ApiError {
    fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        ApiError {
            status,
            detail: detail.into(),
        }
    }

    /// Map a service error, prefixing upstream failures with `context`.
    fn from_service(err: TrackServiceError, context: &str) -> Self {
        match err {
            TrackServiceError::EmptyQuery => {
                ApiError::new(StatusCode::BAD_REQUEST, "Query 'q' is required")
            }
            TrackServiceError::TrackNotFound(_) => {
                ApiError::new(StatusCode::NOT_FOUND, "Track not found")
            }
            TrackServiceError::Upstream(err) => {
                error!("{}: {}", context, err);
                ApiError::new(StatusCode::BAD_GATEWAY, format!("{}: {}", context, err))
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { detail: self.detail })).into_response()
    }
}

#[derive(Serialize, Debug, PartialEq)]
pub struct TrackResponse {
    pub id: String,
    pub name: Option<String>,
    pub artist: Option<String>,
    pub artist_id: Option<String>,
    pub popularity: Option<u32>,
    pub duration_ms: Option<u64>,
    pub audio_features: Option<FeatureRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genres: Option<Vec<String>>,
}

impl From<TrackRecord> for TrackResponse {
    fn from(record: TrackRecord) -> Self {
        let (name, artist, artist_id, popularity, duration_ms) = match record.summary {
            Some(summary) => (
                Some(summary.name),
                Some(summary.artist),
                Some(summary.artist_id),
                summary.popularity,
                summary.duration_ms,
            ),
            None => (None, None, None, None, None),
        };
        TrackResponse {
            id: record.id,
            name,
            artist,
            artist_id,
            popularity,
            duration_ms,
            audio_features: record.features,
            genres: None,
        }
    }
}

#[derive(Serialize)]
struct SearchResponse {
    query: String,
    tracks: Vec<TrackSummary>,
}

#[derive(Serialize)]
struct SimilarEntry {
    track: TrackResponse,
    similarity: f64,
}

#[derive(Serialize)]
struct SimilarResponse {
    track_id: String,
    similar: Vec<SimilarEntry>,
}

#[derive(Serialize)]
struct CacheClearedResponse {
    status: &'static str,
    message: &'static str,
}

fn round_score(score: f64) -> f64 {
    (score * 10_000.0).round() / 10_000.0
}

impl From<SimilarTrack> for SimilarEntry {
    fn from(similar: SimilarTrack) -> Self {
        SimilarEntry {
            track: similar.record.into(),
            similarity: round_score(similar.similarity),
        }
    }
}

async fn clear_cache(State(service): State<TrackService>) -> impl IntoResponse {
    service.clear_cache();
    Json(CacheClearedResponse {
        status: "ok",
        message: "Cache cleared",
    })
}

async fn search(
    State(service): State<TrackService>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let query = params.q.unwrap_or_default();
    let tracks = service
        .search(&query, effective_limit(params.limit))
        .await
        .map_err(|err| ApiError::from_service(err, "Spotify search failed"))?;
    Ok(Json(SearchResponse { query, tracks }))
}

async fn get_track(
    State(service): State<TrackService>,
    Path(id): Path<String>,
) -> Result<Json<TrackResponse>, ApiError> {
    let details = service
        .track_details(&id)
        .await
        .map_err(|err| ApiError::from_service(err, "Spotify request failed"))?;
    let mut response = TrackResponse::from(details.record);
    response.genres = Some(details.genres);
    Ok(Json(response))
}

async fn get_similar(
    State(service): State<TrackService>,
    Path(id): Path<String>,
    Query(params): Query<LimitParams>,
) -> Result<Json<SimilarResponse>, ApiError> {
    let similar = service
        .similar_tracks(&id, effective_limit(params.limit))
        .await
        .map_err(|err| ApiError::from_service(err, "Spotify request failed"))?;
    Ok(Json(SimilarResponse {
        track_id: id,
        similar: similar.into_iter().map(SimilarEntry::from).collect(),
    }))
}

pub fn make_api_routes(state: ServerState) -> Router {
    Router::new()
        .route("/cache", delete(clear_cache))
        .route("/search", get(search))
        .route("/tracks/{id}", get(get_track))
        .route("/tracks/{id}/similar", get(get_similar))
        .with_state(state)
}
