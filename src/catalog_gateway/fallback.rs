//! Synthetic feature records for tracks whose real features are unavailable.
//!
//! Each field starts from a typical baseline and gets independent uniform
//! jitter, then is clamped back into the attribute's domain.

use rand::Rng;

use super::models::{FeatureRecord, FALLBACK_NOTE};

/// Add uniform jitter in `[lo, hi]` to `base`.
fn jitter<R: Rng + ?Sized>(rng: &mut R, base: f64, lo: f64, hi: f64) -> f64 {
    base + rng.random_range(lo..=hi)
}

/// Build a fallback record using the thread-local generator.
pub fn fallback_features() -> FeatureRecord {
    fallback_features_with(&mut rand::rng())
}

/// Build a fallback record from the given generator.
pub fn fallback_features_with<R: Rng + ?Sized>(rng: &mut R) -> FeatureRecord {
    FeatureRecord {
        danceability: Some(jitter(rng, 0.5, -0.15, 0.15).clamp(0.0, 1.0)),
        energy: Some(jitter(rng, 0.5, -0.15, 0.15).clamp(0.0, 1.0)),
        // Truncation toward zero, so key lands on 0..=2.
        key: Some(jitter(rng, 0.0, -2.0, 2.0).clamp(0.0, 11.0) as i32),
        loudness: Some(jitter(rng, -10.0, -8.0, 8.0).clamp(-60.0, 0.0)),
        mode: Some(if rng.random_bool(0.5) { 1 } else { 0 }),
        speechiness: Some(jitter(rng, 0.1, -0.05, 0.15).clamp(0.0, 1.0)),
        acousticness: Some(jitter(rng, 0.5, -0.2, 0.2).clamp(0.0, 1.0)),
        instrumentalness: Some(jitter(rng, 0.0, 0.0, 0.2).clamp(0.0, 1.0)),
        liveness: Some(jitter(rng, 0.2, -0.1, 0.15).clamp(0.0, 1.0)),
        valence: Some(jitter(rng, 0.5, -0.15, 0.15).clamp(0.0, 1.0)),
        tempo: Some(jitter(rng, 120.0, -25.0, 25.0).clamp(50.0, 200.0)),
        note: Some(FALLBACK_NOTE.to_string()),
    }
}
