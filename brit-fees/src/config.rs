//! Fee service configuration.

use serde::{Deserialize, Serialize};

use brit_core::error::{BritError, Result};

use crate::backoff::RetryPolicy;

/// Fee schedule and refresh policy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeConfig {
    /// Fee accrued per wallet send, in satoshis
    pub fee_per_send_sats: u64,
    /// Fewest sends before a fee payment falls due
    pub min_sends: u32,
    /// Most sends before a fee payment falls due
    pub max_sends: u32,
    /// Retry policy for address refreshes
    pub retry: RetryPolicy,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            fee_per_send_sats: 1_000,
            min_sends: 20,
            max_sends: 30,
            retry: RetryPolicy::default(),
        }
    }
}

impl FeeConfig {
    /// Sets the per-send fee.
    pub fn with_fee_per_send(mut self, sats: u64) -> Self {
        self.fee_per_send_sats = sats;
        self
    }

    /// Sets the range the payment threshold is drawn from.
    pub fn with_send_range(mut self, min_sends: u32, max_sends: u32) -> Self {
        self.min_sends = min_sends;
        self.max_sends = max_sends;
        self
    }

    /// Sets the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Checks the send range and retry budget.
    pub fn validate(&self) -> Result<()> {
        if self.min_sends == 0 || self.min_sends > self.max_sends {
            return Err(BritError::ConfigError(format!(
                "invalid send range {}..={}",
                self.min_sends, self.max_sends
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(BritError::ConfigError("max_attempts must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(FeeConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_ranges() {
        assert!(FeeConfig::default().with_send_range(0, 5).validate().is_err());
        assert!(FeeConfig::default().with_send_range(6, 5).validate().is_err());
        assert!(FeeConfig::default().with_send_range(5, 5).validate().is_ok());
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let retry = RetryPolicy {
            max_attempts: 0,
            ..RetryPolicy::default()
        };
        assert!(FeeConfig::default().with_retry(retry).validate().is_err());
    }
}
