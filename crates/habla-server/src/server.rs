//! HTTP server assembly and lifecycle.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use habla_core::{ServerConfig, TtsError, TtsResult};

use crate::handlers::{self, AppState};

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/synthesize", post(handlers::synthesize))
        .route("/health", get(handlers::health))
        .route("/healthz", get(handlers::health))
        .route("/ready", get(handlers::ready))
        .route("/info", get(handlers::info))
        .route("/metrics", get(handlers::metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The HTTP server.
pub struct HttpServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl HttpServer {
    /// Create a server; the address is bound once `run` is called.
    pub fn new(config: ServerConfig, state: Arc<AppState>) -> Self {
        Self { config, state }
    }

    /// Serve until SIGINT/SIGTERM, then drain the scheduler.
    pub async fn run(self) -> TtsResult<()> {
        let app = router(Arc::clone(&self.state));

        let listener =
            tokio::net::TcpListener::bind((self.config.host.as_str(), self.config.port))
                .await
                .map_err(|e| {
                    TtsError::config(format!(
                        "bind {}:{}: {e}",
                        self.config.host, self.config.port
                    ))
                })?;

        info!(
            host = %self.config.host,
            port = self.config.port,
            "HTTP server listening"
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| TtsError::internal(format!("server failed: {e}")))?;

        info!("shutdown signal received, draining scheduler");

        // Worker threads may be mid-inference; give them a bounded window.
        let scheduler = Arc::clone(&self.state.scheduler);
        let drain = tokio::task::spawn_blocking(move || scheduler.shutdown());
        let timeout = Duration::from_secs(self.config.shutdown_timeout_secs);
        if tokio::time::timeout(timeout, drain).await.is_err() {
            warn!("shutdown timeout, forcing exit");
        }

        Ok(())
    }
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
