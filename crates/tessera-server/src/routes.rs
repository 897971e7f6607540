//! Route definitions for the token service.

use crate::handlers;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Create the service router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/token", post(handlers::issue_token))
        .route("/verify", post(handlers::verify_token))
        .route("/public-key", get(handlers::public_key))
        .route("/healthz", get(handlers::healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
