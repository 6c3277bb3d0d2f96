//! API route handlers.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::header,
    response::IntoResponse,
    Json,
};
use tracing::{debug, info};

use brit_core::constants::ENVELOPE_CONTENT_TYPE;
use brit_core::types::timestamp_from_millis;

use crate::dto::*;
use crate::error::ApiError;
use crate::state::AppState;

type Result<T> = std::result::Result<T, ApiError>;

/// POST /brit
///
/// Body is an envelope encrypted to the Matcher; so is the reply, to the
/// payer's reply key. Decryption and ML-KEM work run off the async threads.
pub async fn exchange(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<impl IntoResponse> {
    let responder = state.responder.clone();
    let reply = tokio::task::spawn_blocking(move || responder.handle_request(&body))
        .await
        .map_err(|e| ApiError::internal(format!("Exchange task failed: {}", e)))??;

    debug!(reply_len = reply.len(), "Exchange answered");
    Ok(([(header::CONTENT_TYPE, ENVELOPE_CONTENT_TYPE)], reply))
}

/// GET /api/v1/pool/stats
pub async fn pool_stats(State(state): State<Arc<AppState>>) -> Json<PoolStatsResponse> {
    let stats = state.pool.stats();

    Json(PoolStatsResponse {
        total_addresses: stats.total_addresses,
        cohort_size: stats.cohort_size,
        newest_activation: stats.newest_activation.map(|t| t.timestamp_millis()),
        last_rotation: stats.last_rotation.map(|t| t.timestamp_millis()),
        rotations: stats.rotations,
        rotation_secs: state.config.rotation_secs,
    })
}

/// POST /api/v1/pool/addresses
pub async fn activate_address(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ActivateAddressRequest>,
) -> Result<Json<ActivateAddressResponse>> {
    let activated_at = match req.activated_at {
        Some(millis) => timestamp_from_millis(millis)
            .map_err(|e| ApiError::bad_request(format!("Invalid activated_at: {}", e)))?,
        None => state.clock.now(),
    };

    state.pool.activate(&req.address, activated_at)?;
    state.pool.persist().await?;

    let total_addresses = state.pool.stats().total_addresses;
    info!(total = total_addresses, "Activated address");

    Ok(Json(ActivateAddressResponse {
        address: req.address.trim().to_string(),
        activated_at: activated_at.timestamp_millis(),
        total_addresses,
    }))
}

/// GET /health
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        uptime_seconds: state.uptime_seconds(),
        pool_addresses: state.pool.stats().total_addresses,
    })
}
