use axum::extract::FromRef;
use std::time::Instant;

use crate::track_service::TrackService;

use super::ServerConfig;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub track_service: TrackService,
}

impl ServerState {
    pub fn new(config: ServerConfig, track_service: TrackService) -> ServerState {
        ServerState {
            config,
            start_time: Instant::now(),
            track_service,
        }
    }
}

impl FromRef<ServerState> for TrackService {
    fn from_ref(input: &ServerState) -> Self {
        input.track_service.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
