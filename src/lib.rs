//! Gago Server Library
//!
//! Music search backed by the Spotify Web API, plus "more like this"
//! recommendations computed by cosine similarity over audio features of the
//! tracks returned by the latest search.

pub mod catalog_gateway;
pub mod config;
pub mod server;
pub mod similarity;
pub mod track_cache;
pub mod track_service;

// Re-export commonly used types for convenience
pub use catalog_gateway::{CatalogGateway, SpotifyClient};
pub use server::{make_app, run_server, RequestsLoggingLevel};
pub use track_cache::{GuardedTrackCache, TrackCache};
pub use track_service::TrackService;
