//! App state: Matcher key, address pool, config.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use brit_core::constants::{DEFAULT_COHORT_SIZE, DEFAULT_ROTATION_SECS};
use brit_core::error::{BritError, Result};
use brit_core::traits::{AddressPool, Clock, SystemClock};
use brit_core::types::{KemSecretKey, Timestamp};
use brit_crypto::MlKemEnvelope;
use brit_exchange::MatcherResponder;
use brit_pool::{FileAddressPool, MemoryAddressPool, PoolConfig, PoolStats};

/// Largest request body accepted by default.
const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;

/// Matcher host configuration.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// File holding the Matcher's hex-encoded secret key
    pub secret_key_file: Option<PathBuf>,
    /// Pool snapshot file; the pool lives in memory only when unset
    pub pool_file: Option<PathBuf>,
    /// Addresses per cohort
    pub cohort_size: usize,
    /// Seconds between cohort rotations
    pub rotation_secs: u64,
    /// Largest accepted request body
    pub max_body_bytes: usize,
    /// Bearer token for the pool administration routes; they are closed
    /// when unset
    pub admin_token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            secret_key_file: None,
            pool_file: None,
            cohort_size: DEFAULT_COHORT_SIZE,
            rotation_secs: DEFAULT_ROTATION_SECS,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            admin_token: None,
        }
    }
}

impl ApiConfig {
    /// Reads the config from the environment (and `.env`, if present).
    ///
    /// | Variable | Field |
    /// |---|---|
    /// | `BRIT_MATCHER_SECRET_KEY_FILE` | `secret_key_file` |
    /// | `BRIT_POOL_FILE` | `pool_file` |
    /// | `BRIT_COHORT_SIZE` | `cohort_size` |
    /// | `BRIT_ROTATION_SECS` | `rotation_secs` |
    /// | `BRIT_MAX_BODY_BYTES` | `max_body_bytes` |
    /// | `BRIT_ADMIN_TOKEN` | `admin_token` (blank means unset) |
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        Self {
            secret_key_file: std::env::var("BRIT_MATCHER_SECRET_KEY_FILE").ok().map(PathBuf::from),
            pool_file: std::env::var("BRIT_POOL_FILE").ok().map(PathBuf::from),
            cohort_size: env_number("BRIT_COHORT_SIZE", defaults.cohort_size),
            rotation_secs: env_number("BRIT_ROTATION_SECS", defaults.rotation_secs),
            max_body_bytes: env_number("BRIT_MAX_BODY_BYTES", defaults.max_body_bytes),
            admin_token: std::env::var("BRIT_ADMIN_TOKEN")
                .ok()
                .map(|token| token.trim().to_string())
                .filter(|token| !token.is_empty()),
        }
    }

    /// The pool policy described by this config.
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig::default()
            .with_cohort_size(self.cohort_size)
            .with_rotation_interval(Duration::from_secs(self.rotation_secs))
    }
}

fn env_number<T: std::str::FromStr + Copy + std::fmt::Display>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(variable = name, value = %raw, fallback = %default, "Ignoring unparsable setting");
            default
        }),
        Err(_) => default,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// POOL BACKEND
// ═══════════════════════════════════════════════════════════════════════════════

/// The pool a Matcher serves from.
#[derive(Clone)]
pub enum MatcherPool {
    /// Lost on restart
    Memory(Arc<MemoryAddressPool>),
    /// Snapshotted to disk after every change
    File(Arc<FileAddressPool>),
}

impl MatcherPool {
    /// The pool as seen by the allocation policy.
    pub fn address_pool(&self) -> Arc<dyn AddressPool> {
        match self {
            Self::Memory(pool) => pool.clone(),
            Self::File(pool) => pool.clone(),
        }
    }

    /// Activates an address.
    pub fn activate(&self, address: &str, at: Timestamp) -> Result<()> {
        match self {
            Self::Memory(pool) => pool.activate(address, at),
            Self::File(pool) => pool.activate(address, at),
        }
    }

    /// Rotates the cohort if the interval has elapsed.
    pub fn rotate_if_due(&self, now: Timestamp) -> bool {
        match self {
            Self::Memory(pool) => pool.rotate_if_due(now),
            Self::File(pool) => pool.rotate_if_due(now),
        }
    }

    /// Pool counters.
    pub fn stats(&self) -> PoolStats {
        match self {
            Self::Memory(pool) => pool.stats(),
            Self::File(pool) => pool.stats(),
        }
    }

    /// Writes unsaved changes to disk (no-op for memory pools).
    pub async fn persist(&self) -> Result<()> {
        match self {
            Self::Memory(_) => Ok(()),
            Self::File(pool) => pool.flush().await,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// APP STATE
// ═══════════════════════════════════════════════════════════════════════════════

/// Shared state behind every handler.
pub struct AppState {
    /// Host configuration
    pub config: ApiConfig,
    /// Address pool
    pub pool: MatcherPool,
    /// Request handler
    pub responder: Arc<MatcherResponder>,
    /// Source of "now"
    pub clock: Arc<dyn Clock>,
    /// When the host started
    pub started_at: Instant,
}

impl AppState {
    /// Assembles state from already loaded parts.
    pub fn new(
        config: ApiConfig,
        secret_key: KemSecretKey,
        pool: MatcherPool,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let responder = Arc::new(MatcherResponder::new(
            secret_key,
            pool.address_pool(),
            clock.clone(),
            Arc::new(MlKemEnvelope),
        ));

        Self {
            config,
            pool,
            responder,
            clock,
            started_at: Instant::now(),
        }
    }

    /// Loads the secret key and opens the pool named by `config`.
    ///
    /// # Errors
    /// `ConfigError` if no secret key file is configured; I/O, hex and pool
    /// errors from loading.
    pub async fn from_config(config: ApiConfig) -> Result<Self> {
        let pool_config = config.pool_config();
        pool_config.validate()?;

        let key_path = config.secret_key_file.clone().ok_or_else(|| {
            BritError::ConfigError("BRIT_MATCHER_SECRET_KEY_FILE is not set".into())
        })?;
        let secret_key = KemSecretKey::from_hex(&tokio::fs::read_to_string(&key_path).await?)?;

        let pool = match &config.pool_file {
            Some(path) => {
                let pool = FileAddressPool::open(path, pool_config).await?;
                info!(path = ?path, addresses = pool.len(), "Opened pool file");
                MatcherPool::File(Arc::new(pool))
            }
            None => MatcherPool::Memory(Arc::new(MemoryAddressPool::new(pool_config))),
        };

        Ok(Self::new(config, secret_key, pool, Arc::new(SystemClock)))
    }

    /// Seconds since startup.
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
