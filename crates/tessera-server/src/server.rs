//! Server startup.

use crate::config::AppConfig;
use crate::error::ServerError;
use crate::routes;
use crate::state::AppState;
use std::sync::Arc;
use tessera_token::KeyPairProvider;
use tokio::net::TcpListener;

/// The token service.
pub struct TokenServer {
    config: AppConfig,
}

impl TokenServer {
    /// Create a new server with the given configuration.
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Generate the signing keys, then serve until Ctrl-C.
    ///
    /// No listener is bound until the keypair exists.
    pub async fn run(&self) -> Result<(), ServerError> {
        tracing::info!("Generating Ed25519 key pair (v4.public)");
        let provider =
            KeyPairProvider::generate().map_err(|e| ServerError::StartupFailed(e.to_string()))?;

        let state = Arc::new(AppState::init(&self.config, &provider)?);
        let app = routes::create_router(state);

        let addr = &self.config.server.bind;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::StartupFailed(format!("bind {addr}: {e}")))?;
        tracing::info!(address = %addr, "tessera-server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::StartupFailed(e.to_string()))?;

        Ok(())
    }

    /// Get the configured bind address.
    pub fn bind_addr(&self) -> &str {
        &self.config.server.bind
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
