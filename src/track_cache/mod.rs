//! Process-lifetime cache of tracks seen in the current search context.
//!
//! The cache holds whatever the last search returned plus anything fetched
//! since. It is cleared wholesale on every new search so that similarity is
//! only ever computed between tracks of the same result set. Nothing is
//! written to disk.
//!
//! `TrackCache` itself does no locking; it is shared between request
//! handlers as a [`GuardedTrackCache`].

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::catalog_gateway::{FeatureRecord, TrackSummary};

pub type GuardedTrackCache = Arc<Mutex<TrackCache>>;

/// A cached track. Either half may be missing while the record is being
/// populated.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackRecord {
    pub id: String,
    pub summary: Option<TrackSummary>,
    pub features: Option<FeatureRecord>,
}

impl TrackRecord {
    pub fn artist(&self) -> Option<&str> {
        self.summary.as_ref().map(|s| s.artist.as_str())
    }

    pub fn has_features(&self) -> bool {
        self.features.is_some()
    }
}

#[derive(Debug, Default)]
pub struct TrackCache {
    tracks: BTreeMap<String, TrackRecord>,
    /// Bumped by every [`TrackCache::clear`].
    generation: u64,
}

impl TrackCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_guarded() -> GuardedTrackCache {
        Arc::new(Mutex::new(Self::new()))
    }

    pub fn get(&self, id: &str) -> Option<&TrackRecord> {
        self.tracks.get(id)
    }

    /// Store metadata for `id`, keeping any features already attached.
    pub fn upsert_metadata(&mut self, id: &str, summary: TrackSummary) {
        match self.tracks.get_mut(id) {
            Some(record) => record.summary = Some(summary),
            None => {
                self.tracks.insert(
                    id.to_string(),
                    TrackRecord {
                        id: id.to_string(),
                        summary: Some(summary),
                        features: None,
                    },
                );
            }
        }
    }

    /// Attach features to `id`, creating a features-only record if needed.
    pub fn upsert_features(&mut self, id: &str, features: FeatureRecord) {
        match self.tracks.get_mut(id) {
            Some(record) => record.features = Some(features),
            None => {
                self.tracks.insert(
                    id.to_string(),
                    TrackRecord {
                        id: id.to_string(),
                        summary: None,
                        features: Some(features),
                    },
                );
            }
        }
    }

    /// All records that have features, ordered by id.
    pub fn all_with_features(&self) -> Vec<(&str, &TrackRecord)> {
        self.tracks
            .iter()
            .filter(|(_, record)| record.has_features())
            .map(|(id, record)| (id.as_str(), record))
            .collect()
    }

    /// All cached ids, ordered.
    pub fn all_ids(&self) -> Vec<String> {
        self.tracks.keys().cloned().collect()
    }

    /// Ids of records still waiting for features.
    pub fn ids_missing_features(&self) -> Vec<String> {
        self.tracks
            .values()
            .filter(|record| !record.has_features())
            .map(|record| record.id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Identifies the current search context. Writers that fetched data
    /// under an older generation must not store it.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
        self.generation = self.generation.wrapping_add(1);
    }
}
