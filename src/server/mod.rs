pub mod config;
mod http_layers;
#[allow(clippy::module_inception)]
pub mod server;
pub mod state;
mod tracks;

pub use config::ServerConfig;
pub use http_layers::*;
pub use server::{make_app, run_server};
use tracks::make_api_routes;
pub use tracks::{TrackResponse, DEFAULT_RESULTS_LIMIT};
