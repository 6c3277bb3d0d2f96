//! API route configuration.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::limit::RequestBodyLimitLayer;

use brit_core::constants::MATCHER_PATH;

use crate::auth;
use crate::handlers;
use crate::state::AppState;

/// Creates the API router with all routes configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    let max_body = state.config.max_body_bytes;

    // Pool administration, bearer token required
    let admin = Router::new()
        .route("/api/v1/pool/stats", get(handlers::pool_stats))
        .route("/api/v1/pool/addresses", post(handlers::activate_address))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_admin));

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))

        // Address exchange
        .route(MATCHER_PATH, post(handlers::exchange))

        .merge(admin)

        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body))
        .with_state(state)
}
