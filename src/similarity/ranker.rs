//! Cosine-similarity ranking over cached tracks.

use std::cmp::Ordering;

use super::vectorizer::vectorize;
use crate::track_cache::TrackRecord;

/// Score multiplier applied to candidates by the same artist as the query.
pub const SAME_ARTIST_PENALTY: f64 = 0.7;

/// Norm substituted for a zero-length vector.
const ZERO_NORM_SUBSTITUTE: f64 = 1e-10;

#[derive(Clone, Debug, PartialEq)]
pub struct SimilarityResult {
    pub track_id: String,
    pub score: f64,
}

fn norm(v: &[f64]) -> f64 {
    let n = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if n == 0.0 {
        ZERO_NORM_SUBSTITUTE
    } else {
        n
    }
}

/// Cosine similarity between two equally sized vectors.
///
/// A zero vector scores 0 against anything.
///
/// # Panics
/// If the vectors have different lengths.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(
        a.len(),
        b.len(),
        "cosine_similarity called with vectors of different lengths"
    );
    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    dot / (norm(a) * norm(b))
}

fn normalized_artist(record: &TrackRecord) -> String {
    record
        .artist()
        .map(|a| a.trim().to_lowercase())
        .unwrap_or_default()
}

/// Rank candidates by similarity to `query_id`.
///
/// `lookup` resolves the query track; if it is unknown or has no features
/// the result is empty. `candidates` should yield only records with
/// features; records without them are skipped. Scores are clamped into
/// [0, 1], then same-artist candidates are multiplied by
/// [`SAME_ARTIST_PENALTY`] before sorting.
///
/// Results are sorted by score descending, ties broken by track id
/// ascending, and truncated to `limit` (at least 1).
pub fn rank<'a, L, I>(query_id: &str, limit: usize, lookup: L, candidates: I) -> Vec<SimilarityResult>
where
    L: FnOnce(&str) -> Option<&'a TrackRecord>,
    I: IntoIterator<Item = (&'a str, &'a TrackRecord)>,
{
    let Some(query) = lookup(query_id) else {
        return Vec::new();
    };
    let Some(query_features) = query.features.as_ref() else {
        return Vec::new();
    };

    let query_vector = vectorize(query_features);
    let query_artist = normalized_artist(query);

    let mut scored: Vec<SimilarityResult> = candidates
        .into_iter()
        .filter(|(id, _)| *id != query_id)
        .filter_map(|(id, record)| {
            let features = record.features.as_ref()?;
            let mut score =
                cosine_similarity(&query_vector, &vectorize(features)).clamp(0.0, 1.0);
            if !query_artist.is_empty() && normalized_artist(record) == query_artist {
                score *= SAME_ARTIST_PENALTY;
            }
            Some(SimilarityResult {
                track_id: id.to_string(),
                score,
            })
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.track_id.cmp(&b.track_id))
    });
    scored.truncate(limit.max(1));
    scored
}
