//! Access to the upstream music catalog.
//!
//! The rest of the server only sees the [`CatalogGateway`] trait. Search and
//! track metadata failures propagate, while feature and genre lookups are
//! total: they degrade to fallback features and an empty genre list.

mod error;
pub mod fallback;
pub mod models;
pub mod spotify;

use async_trait::async_trait;

pub use error::CatalogError;
pub use fallback::{fallback_features, fallback_features_with};
pub use models::{FeatureLookup, FeatureRecord, TrackSummary, FALLBACK_NOTE};
pub use spotify::{SpotifyClient, SpotifySettings};

/// Maximum number of genres reported for an artist.
pub const MAX_ARTIST_GENRES: usize = 3;

#[async_trait]
pub trait CatalogGateway: Send + Sync {
    /// Search tracks matching `query`.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<TrackSummary>, CatalogError>;

    /// Fetch track metadata. `Ok(None)` when the upstream does not know the id.
    async fn get_track(&self, id: &str) -> Result<Option<TrackSummary>, CatalogError>;

    /// Fetch audio features, substituting a fallback record on any failure.
    async fn get_features(&self, id: &str) -> FeatureLookup;

    /// Up to [`MAX_ARTIST_GENRES`] genres for the artist, empty on any failure.
    async fn get_artist_genres(&self, artist_id: &str) -> Vec<String>;
}
