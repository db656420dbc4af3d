mod ranker;
mod vectorizer;

pub use ranker::{cosine_similarity, rank, SimilarityResult, SAME_ARTIST_PENALTY};
pub use vectorizer::{vectorize, FeatureVector, FEATURE_DIMENSIONS};
