//! Orchestrates cache population, gateway calls and similarity ranking.
//!
//! The cache mutex is never held across an `.await`: every operation
//! snapshots what it needs, releases the lock, talks to the gateway and
//! re-locks to write. Concurrent requests racing on the same track simply
//! overwrite each other with equivalent data.

use futures::stream::{self, StreamExt};
use std::sync::{Arc, MutexGuard};
use thiserror::Error;
use tracing::{debug, info};

use crate::catalog_gateway::{CatalogError, CatalogGateway, FeatureRecord, TrackSummary};
use crate::similarity::rank;
use crate::track_cache::{GuardedTrackCache, TrackCache, TrackRecord};

/// Upper bound on concurrent feature fetches while backfilling.
const BACKFILL_CONCURRENCY: usize = 4;

#[derive(Debug, Error)]
pub enum TrackServiceError {
    #[error("Query must not be empty")]
    EmptyQuery,

    #[error("Track not found: {0}")]
    TrackNotFound(String),

    #[error(transparent)]
    Upstream(#[from] CatalogError),
}

/// A track with its features attached, plus its artist's genres.
#[derive(Clone, Debug)]
pub struct TrackDetails {
    pub record: TrackRecord,
    pub genres: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct SimilarTrack {
    pub record: TrackRecord,
    pub similarity: f64,
}

#[derive(Clone)]
pub struct TrackService {
    gateway: Arc<dyn CatalogGateway>,
    cache: GuardedTrackCache,
}

impl TrackService {
    pub fn new(gateway: Arc<dyn CatalogGateway>, cache: GuardedTrackCache) -> Self {
        Self { gateway, cache }
    }

    #[cfg(test)]
    fn cache(&self) -> &GuardedTrackCache {
        &self.cache
    }

    fn lock_cache(&self) -> MutexGuard<'_, TrackCache> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The cached record for `id` and the generation it was read under.
    fn cached(&self, id: &str) -> (Option<TrackRecord>, u64) {
        let cache = self.lock_cache();
        (cache.get(id).cloned(), cache.generation())
    }

    /// Number of tracks in the current search context.
    pub fn cached_track_count(&self) -> usize {
        self.lock_cache().len()
    }

    /// Drop every cached track. Returns how many were removed.
    pub fn clear_cache(&self) -> usize {
        let mut cache = self.lock_cache();
        let removed = cache.len();
        cache.clear();
        removed
    }

    /// Start a new search context: clear the cache, search upstream and
    /// cache the metadata of every result.
    ///
    /// Results are not cached if another search started meanwhile.
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<TrackSummary>, TrackServiceError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(TrackServiceError::EmptyQuery);
        }

        let generation = {
            let mut cache = self.lock_cache();
            let removed = cache.len();
            cache.clear();
            info!("Cleared {} cached tracks for new search {:?}", removed, query);
            cache.generation()
        };

        let tracks = self.gateway.search(query, limit).await?;

        let mut cache = self.lock_cache();
        if cache.generation() != generation {
            debug!("Search {:?} was superseded, not caching its results", query);
            return Ok(tracks);
        }
        for track in tracks.iter() {
            cache.upsert_metadata(&track.id, track.clone());
        }
        Ok(tracks)
    }

    /// Cached metadata for `id`, or the upstream's if the cache has none.
    async fn resolve_summary(
        &self,
        id: &str,
        cached: Option<TrackRecord>,
    ) -> Result<TrackSummary, TrackServiceError> {
        if let Some(summary) = cached.and_then(|record| record.summary) {
            return Ok(summary);
        }
        self.gateway
            .get_track(id)
            .await?
            .ok_or_else(|| TrackServiceError::TrackNotFound(id.to_string()))
    }

    async fn fetch_features(&self, id: &str) -> FeatureRecord {
        let lookup = self.gateway.get_features(id).await;
        if lookup.is_fallback() {
            debug!("Track {} gets fallback features", id);
        }
        lookup.into_record()
    }

    /// Resolve metadata and features for `id` and store them, unless the
    /// cache was cleared since `generation`. Returns the record and whether
    /// it was stored.
    async fn fetch_and_store(
        &self,
        id: &str,
        cached: Option<TrackRecord>,
        generation: u64,
    ) -> Result<(TrackRecord, bool), TrackServiceError> {
        let summary = self.resolve_summary(id, cached).await?;
        let features = self.fetch_features(id).await;

        let mut cache = self.lock_cache();
        let stored = cache.generation() == generation;
        if stored {
            cache.upsert_metadata(id, summary.clone());
            cache.upsert_features(id, features.clone());
        } else {
            debug!("Cache cleared while fetching track {}, not caching it", id);
        }
        let record = TrackRecord {
            id: id.to_string(),
            summary: Some(summary),
            features: Some(features),
        };
        Ok((record, stored))
    }

    /// Track metadata with features, fetching and caching whatever is missing.
    pub async fn track_details(&self, id: &str) -> Result<TrackDetails, TrackServiceError> {
        let record = match self.cached(id) {
            (Some(record), _) if record.has_features() => record,
            (cached, generation) => self.fetch_and_store(id, cached, generation).await?.0,
        };

        let genres = match record.summary.as_ref() {
            Some(summary) => self.gateway.get_artist_genres(&summary.artist_id).await,
            None => Vec::new(),
        };

        Ok(TrackDetails { record, genres })
    }

    /// Tracks from the current search context most similar to `id`.
    ///
    /// Empty when a new search replaced the context while the query track
    /// was being fetched.
    pub async fn similar_tracks(
        &self,
        id: &str,
        limit: usize,
    ) -> Result<Vec<SimilarTrack>, TrackServiceError> {
        let (cached, generation) = self.cached(id);
        if !cached.as_ref().is_some_and(TrackRecord::has_features) {
            let (_, stored) = self.fetch_and_store(id, cached, generation).await?;
            if !stored {
                return Ok(Vec::new());
            }
        }

        self.backfill_features(id).await;

        let cache = self.lock_cache();
        let ranked = rank(id, limit, |tid| cache.get(tid), cache.all_with_features());
        Ok(ranked
            .into_iter()
            .filter_map(|result| {
                cache.get(&result.track_id).map(|record| SimilarTrack {
                    record: record.clone(),
                    similarity: result.score,
                })
            })
            .collect())
    }

    /// Fetch features for every cached track except `query_id` that lacks them.
    async fn backfill_features(&self, query_id: &str) {
        let missing: Vec<String> = self
            .lock_cache()
            .ids_missing_features()
            .into_iter()
            .filter(|tid| tid != query_id)
            .collect();
        if missing.is_empty() {
            return;
        }

        debug!("Backfilling features for {} cached tracks", missing.len());
        let fetched: Vec<_> = stream::iter(missing)
            .map(|tid| async move {
                let features = self.fetch_features(&tid).await;
                (tid, features)
            })
            .buffer_unordered(BACKFILL_CONCURRENCY)
            .collect()
            .await;

        let mut cache = self.lock_cache();
        for (tid, features) in fetched {
            // Skip tracks dropped by a search that started meanwhile.
            if cache.get(&tid).is_some() {
                cache.upsert_features(&tid, features);
            }
        }
    }
}
