use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::HeaderValue,
    middleware,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;

use crate::catalog_gateway::CatalogGateway;
use crate::track_cache::GuardedTrackCache;
use crate::track_service::TrackService;

use super::{log_requests, make_api_routes, state::ServerState, ServerConfig};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub version: String,
    pub cached_tracks: usize,
}

#[derive(Serialize)]
struct HealthStatus {
    pub status: &'static str,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    Json(ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        version: env!("CARGO_PKG_VERSION").to_string(),
        cached_tracks: state.track_service.cached_track_count(),
    })
}

async fn health() -> impl IntoResponse {
    Json(HealthStatus { status: "ok" })
}

fn make_cors_layer(allowed_origins: &[String]) -> Result<CorsLayer> {
    if allowed_origins.is_empty() {
        return Ok(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any));
    }
    let origins = allowed_origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .with_context(|| format!("Invalid allowed origin {:?}", origin))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any))
}

pub fn make_app(
    config: ServerConfig,
    gateway: Arc<dyn CatalogGateway>,
    cache: GuardedTrackCache,
) -> Result<Router> {
    let track_service = TrackService::new(gateway, cache);
    let state = ServerState::new(config.clone(), track_service);

    let home_router: Router = match config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new()
            .route("/", get(home))
            .with_state(state.clone()),
    };

    let app: Router = home_router
        .route("/health", get(health))
        .nest("/api", make_api_routes(state.clone()))
        .layer(make_cors_layer(&config.allowed_origins)?)
        .layer(middleware::from_fn_with_state(state, log_requests));

    Ok(app)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
    }
    info!("Shutting down");
}

pub async fn run_server(
    config: ServerConfig,
    gateway: Arc<dyn CatalogGateway>,
    cache: GuardedTrackCache,
) -> Result<()> {
    let address = format!("{}:{}", config.host, config.port);
    let app = make_app(config, gateway, cache)?;

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("Listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
