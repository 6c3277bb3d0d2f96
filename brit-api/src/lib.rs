//! # BRIT Matcher Server
//!
//! HTTP host for a Matcher: decrypts payer requests, runs the allocation
//! policy and returns the encrypted response.
//!
//! ## Endpoints
//!
//! - `POST /brit` - Encrypted address exchange (`application/octet-stream`)
//! - `GET /health` - Liveness and pool size
//! - `GET /api/v1/pool/stats` - Pool counters (admin)
//! - `POST /api/v1/pool/addresses` - Activate a payee address (admin)
//!
//! Admin routes require `Authorization: Bearer <BRIT_ADMIN_TOKEN>` and answer
//! 401 when no token is configured.
//!
//! ## Example
//!
//! ```rust,ignore
//! use brit_api::{ApiConfig, ApiServer, AppState};
//!
//! let state = AppState::from_config(ApiConfig::from_env()).await?;
//! let server = ApiServer::new(state);
//! server.run(([0, 0, 0, 0], 3001)).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod auth;
mod routes;
mod handlers;
mod state;
mod dto;
mod error;

pub use routes::create_router;
pub use state::{ApiConfig, AppState, MatcherPool};
pub use error::ApiError;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Longest pause between rotation checks.
const MAX_ROTATION_TICK: Duration = Duration::from_secs(60);

/// API server for a BRIT Matcher.
pub struct ApiServer {
    state: Arc<AppState>,
}

impl ApiServer {
    /// Creates a server around loaded state.
    pub fn new(state: AppState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    /// Shared state.
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Creates the router with all routes configured.
    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        create_router(self.state.clone())
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Starts the task that advances the cohort on the configured cadence.
    pub fn spawn_rotation(&self) -> JoinHandle<()> {
        let state = self.state.clone();
        let tick = Duration::from_secs(state.config.rotation_secs)
            .min(MAX_ROTATION_TICK)
            .max(Duration::from_secs(1));

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                rotate_once(&state).await;
            }
        })
    }

    /// Runs the server on the given address.
    pub async fn run(self, addr: impl Into<SocketAddr>) -> std::io::Result<()> {
        let addr = addr.into();
        let listener = tokio::net::TcpListener::bind(addr).await?;

        let rotation = self.spawn_rotation();
        info!("BRIT Matcher listening on {}", addr);

        let result = axum::serve(listener, self.router()).await;
        rotation.abort();
        result
    }
}

/// Rotates the cohort if due and persists the pool when it changed.
async fn rotate_once(state: &AppState) {
    if !state.pool.rotate_if_due(state.clock.now()) {
        return;
    }
    if let Err(error) = state.pool.persist().await {
        warn!(%error, "Failed to persist pool after rotation");
    }
}

/// Starts a Matcher configured from the environment.
pub async fn start_server(port: u16) -> brit_core::Result<()> {
    let state = AppState::from_config(ApiConfig::from_env()).await?;
    ApiServer::new(state).run(([0, 0, 0, 0], port)).await?;
    Ok(())
}
