//! Data shapes exchanged with the upstream music catalog.
//!
//! `TrackSummary` and `FeatureRecord` are what the rest of the server sees;
//! the `Spotify*` types match the JSON returned by the Web API and are only
//! used for decoding.

use serde::{Deserialize, Serialize};

/// Provenance marker stored in `FeatureRecord::note` for synthesized records.
pub const FALLBACK_NOTE: &str = "fallback_due_to_api_restriction_or_unavailable";

/// Track metadata as consumed by the cache and the HTTP layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackSummary {
    pub id: String,
    pub name: String,
    pub artist: String,
    pub artist_id: String,
    pub popularity: Option<u32>,
    pub duration_ms: Option<u64>,
}

/// Audio descriptors for a single track.
///
/// Every attribute is optional: upstream records may omit fields and the
/// vectorizer treats anything absent as zero.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    #[serde(default)]
    pub danceability: Option<f64>,
    #[serde(default)]
    pub energy: Option<f64>,
    #[serde(default)]
    pub key: Option<i32>,
    #[serde(default)]
    pub loudness: Option<f64>,
    #[serde(default)]
    pub mode: Option<i32>,
    #[serde(default)]
    pub speechiness: Option<f64>,
    #[serde(default)]
    pub acousticness: Option<f64>,
    #[serde(default)]
    pub instrumentalness: Option<f64>,
    #[serde(default)]
    pub liveness: Option<f64>,
    #[serde(default)]
    pub valence: Option<f64>,
    #[serde(default)]
    pub tempo: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl FeatureRecord {
    pub fn is_fallback(&self) -> bool {
        self.note.as_deref() == Some(FALLBACK_NOTE)
    }
}

/// Result of a feature fetch. Always carries a record; the variant says
/// whether it came from upstream or was synthesized.
#[derive(Clone, Debug, PartialEq)]
pub enum FeatureLookup {
    Upstream(FeatureRecord),
    Fallback(FeatureRecord),
}

impl FeatureLookup {
    pub fn is_fallback(&self) -> bool {
        matches!(self, FeatureLookup::Fallback(_))
    }

    pub fn into_record(self) -> FeatureRecord {
        match self {
            FeatureLookup::Upstream(record) | FeatureLookup::Fallback(record) => record,
        }
    }
}

// =============================================================================
// Spotify Web API response types
// =============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct SpotifyTokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_lifetime")]
    pub expires_in: u64,
}

fn default_token_lifetime() -> u64 {
    3600
}

#[derive(Debug, Deserialize)]
pub(crate) struct SpotifyArtistRef {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SpotifyTrack {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub artists: Vec<SpotifyArtistRef>,
    pub popularity: Option<u32>,
    pub duration_ms: Option<u64>,
}

impl SpotifyTrack {
    /// Convert to the summary shape, using the first listed artist.
    pub fn into_summary(self) -> TrackSummary {
        let (artist, artist_id) = match self.artists.into_iter().next() {
            Some(first) => (
                first.name.unwrap_or_default(),
                first.id.unwrap_or_default(),
            ),
            None => (String::new(), String::new()),
        };
        TrackSummary {
            id: self.id,
            name: self.name.unwrap_or_default(),
            artist,
            artist_id,
            popularity: self.popularity,
            duration_ms: self.duration_ms,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SpotifyTrackPage {
    #[serde(default)]
    pub items: Vec<SpotifyTrack>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SpotifySearchResponse {
    #[serde(default)]
    pub tracks: SpotifyTrackPage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SpotifyArtist {
    #[serde(default)]
    pub genres: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SpotifyErrorBody {
    pub error: Option<SpotifyErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SpotifyErrorDetail {
    pub message: Option<String>,
}
