//! Test server lifecycle management
//!
//! This module manages spawning and shutting down test HTTP servers.
//! Each test gets an isolated server with its own track cache.

use super::constants::*;
use super::fixtures::MockCatalogGateway;
use gago_server::catalog_gateway::CatalogGateway;
use gago_server::server::{make_app, RequestsLoggingLevel, ServerConfig};
use gago_server::{GuardedTrackCache, TrackCache};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Test server instance with an isolated cache
///
/// When dropped, the server gracefully shuts down.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// The server's cache, for direct inspection in tests
    pub cache: GuardedTrackCache,

    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a server backed by the fixture catalog
    pub async fn spawn() -> Self {
        Self::spawn_with_gateway(Arc::new(MockCatalogGateway::new())).await
    }

    /// Spawns a server on a random port using `gateway` as its upstream
    ///
    /// # Panics
    ///
    /// Panics if port binding fails or the server doesn't become ready
    /// within [`SERVER_READY_TIMEOUT_MS`].
    pub async fn spawn_with_gateway(gateway: Arc<dyn CatalogGateway>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");

        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let base_url = format!("http://127.0.0.1:{}", port);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            port,
            host: "127.0.0.1".to_string(),
            requests_logging_level: RequestsLoggingLevel::None,
            ..ServerConfig::default()
        };

        let cache = TrackCache::new_guarded();
        let app = make_app(config, gateway, cache.clone()).expect("Failed to build app");

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            cache,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Number of tracks currently cached by the server
    pub fn cached_track_count(&self) -> usize {
        self.cache.lock().unwrap().len()
    }

    /// Waits for the server to become ready by polling /health
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/health", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
