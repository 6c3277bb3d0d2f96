//! Pool configuration.

use std::time::Duration;

use brit_core::constants::{DEFAULT_COHORT_SIZE, DEFAULT_ROTATION_SECS};
use brit_core::error::{BritError, Result};

/// Cohort policy for an address pool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of addresses in each cohort
    pub cohort_size: usize,
    /// How long a cohort stays current before rotation is due
    pub rotation_interval: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            cohort_size: DEFAULT_COHORT_SIZE,
            rotation_interval: Duration::from_secs(DEFAULT_ROTATION_SECS),
        }
    }
}

impl PoolConfig {
    /// Sets the cohort size.
    pub fn with_cohort_size(mut self, cohort_size: usize) -> Self {
        self.cohort_size = cohort_size;
        self
    }

    /// Sets the rotation interval.
    pub fn with_rotation_interval(mut self, interval: Duration) -> Self {
        self.rotation_interval = interval;
        self
    }

    /// Rejects configurations that would never hand out an address.
    pub fn validate(&self) -> Result<()> {
        if self.cohort_size == 0 {
            return Err(BritError::ConfigError("cohort size must be at least 1".into()));
        }
        if self.rotation_interval.is_zero() {
            return Err(BritError::ConfigError("rotation interval must be non-zero".into()));
        }
        Ok(())
    }
}
