//! Feature record to numeric vector conversion.

use crate::catalog_gateway::FeatureRecord;

/// Number of dimensions produced by [`vectorize`].
pub const FEATURE_DIMENSIONS: usize = 11;

pub type FeatureVector = [f64; FEATURE_DIMENSIONS];

const TEMPO_MIN_BPM: f64 = 50.0;
const TEMPO_MAX_BPM: f64 = 200.0;
const LOUDNESS_MIN_DB: f64 = -60.0;
const LOUDNESS_MAX_DB: f64 = 0.0;

fn rescale(value: f64, min: f64, max: f64) -> f64 {
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}

/// Convert a feature record into a fixed-order vector.
///
/// Absent attributes contribute 0.0. Tempo and loudness are rescaled into
/// [0, 1]; every other attribute passes through unchanged, so `key` keeps
/// its 0..=11 range.
pub fn vectorize(features: &FeatureRecord) -> FeatureVector {
    let raw = |v: Option<f64>| v.unwrap_or(0.0);
    let int = |v: Option<i32>| v.map(f64::from).unwrap_or(0.0);

    [
        raw(features.danceability),
        raw(features.energy),
        int(features.key),
        features
            .loudness
            .map(|db| rescale(db, LOUDNESS_MIN_DB, LOUDNESS_MAX_DB))
            .unwrap_or(0.0),
        int(features.mode),
        raw(features.speechiness),
        raw(features.acousticness),
        raw(features.instrumentalness),
        raw(features.liveness),
        raw(features.valence),
        features
            .tempo
            .map(|bpm| rescale(bpm, TEMPO_MIN_BPM, TEMPO_MAX_BPM))
            .unwrap_or(0.0),
    ]
}
