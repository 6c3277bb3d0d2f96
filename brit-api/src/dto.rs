//! Request and response bodies for the JSON endpoints.

use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status
    pub status: String,
    /// Version
    pub version: String,
    /// Uptime in seconds
    pub uptime_seconds: u64,
    /// Addresses held by the pool
    pub pool_addresses: usize,
}

/// Pool counters.
#[derive(Debug, Serialize, Deserialize)]
pub struct PoolStatsResponse {
    /// Addresses held by the pool
    pub total_addresses: usize,
    /// Addresses in the current cohort
    pub cohort_size: usize,
    /// Newest activation time (ms since epoch)
    pub newest_activation: Option<i64>,
    /// Last cohort rotation (ms since epoch)
    pub last_rotation: Option<i64>,
    /// Rotations since startup
    pub rotations: u64,
    /// Configured rotation interval in seconds
    pub rotation_secs: u64,
}

/// Request to activate a payee address.
#[derive(Debug, Deserialize)]
pub struct ActivateAddressRequest {
    /// Payee address
    pub address: String,
    /// Activation time (ms since epoch); now when absent
    pub activated_at: Option<i64>,
}

/// Activation result.
#[derive(Debug, Serialize, Deserialize)]
pub struct ActivateAddressResponse {
    /// The stored address
    pub address: String,
    /// Activation time (ms since epoch)
    pub activated_at: i64,
    /// Addresses held by the pool afterwards
    pub total_addresses: usize,
}
