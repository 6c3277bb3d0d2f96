//! Bearer-token guard for pool administration.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::error::ApiError;
use crate::state::AppState;

/// Lets a request through only if it carries `Authorization: Bearer <token>`
/// matching the configured admin token. With no token configured, every
/// administration request is refused.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.config.admin_token.as_deref() else {
        warn!(path = %request.uri().path(), "Pool administration is disabled");
        return Err(ApiError::unauthorized("Pool administration is disabled"));
    };

    let presented = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::unauthorized("Missing bearer token"))?;

    if !bool::from(presented.as_bytes().ct_eq(expected.as_bytes())) {
        warn!(path = %request.uri().path(), "Rejected admin token");
        return Err(ApiError::unauthorized("Invalid bearer token"));
    }

    Ok(next.run(request).await)
}
