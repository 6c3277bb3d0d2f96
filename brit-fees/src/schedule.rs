//! Fee accrual.
//!
//! Every wallet send accrues `fee_per_send_sats`. Once the number of sends
//! since the last payment reaches a threshold drawn at random from
//! `[min_sends, max_sends]`, a payment of the accrued amount falls due. The
//! random threshold keeps payment timing from marking a wallet on chain.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::FeeConfig;

/// A fee payment the wallet should make.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeePayment {
    /// Address to pay, drawn from the current allocation
    pub address: String,
    /// Amount in satoshis
    pub amount_sats: u64,
}

/// Sends and fees since the last payment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeState {
    /// Sends recorded since the last payment
    pub sends_since_payment: u32,
    /// Fees accrued since the last payment
    pub accrued_sats: u64,
    /// Send count at which the next payment falls due
    pub threshold: u32,
}

impl FeeState {
    /// Fresh state with a newly drawn threshold.
    pub fn new(config: &FeeConfig) -> Self {
        Self {
            sends_since_payment: 0,
            accrued_sats: 0,
            threshold: draw_threshold(config),
        }
    }

    /// Records one wallet send.
    pub fn record_send(&mut self, config: &FeeConfig) {
        self.sends_since_payment = self.sends_since_payment.saturating_add(1);
        self.accrued_sats = self.accrued_sats.saturating_add(config.fee_per_send_sats);
    }

    /// Whether a payment is due.
    pub fn is_due(&self) -> bool {
        self.accrued_sats > 0 && self.sends_since_payment >= self.threshold
    }

    /// The payment due now, paid to a random address from `addresses`.
    pub fn payment_due(&self, addresses: &[String]) -> Option<FeePayment> {
        if !self.is_due() {
            return None;
        }
        let address = addresses.choose(&mut rand::thread_rng())?;
        Some(FeePayment {
            address: address.clone(),
            amount_sats: self.accrued_sats,
        })
    }

    /// Clears the accrual after a payment and draws the next threshold.
    pub fn reset(&mut self, config: &FeeConfig) {
        *self = Self::new(config);
    }
}

fn draw_threshold(config: &FeeConfig) -> u32 {
    if config.min_sends >= config.max_sends {
        config.min_sends
    } else {
        rand::thread_rng().gen_range(config.min_sends..=config.max_sends)
    }
}
