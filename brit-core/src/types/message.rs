//! Exchange messages.
//!
//! A [`PayerRequest`] travels from wallet to Matcher and a
//! [`MatcherResponse`] travels back. Both are transient per-exchange values;
//! see [`crate::wire`] for their encoding.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{PAYER_ID_SIZE, PROTOCOL_VERSION};
use crate::error::{BritError, Result};
use crate::types::KemPublicKey;

/// UTC instant with millisecond precision, as carried on the wire.
pub type Timestamp = DateTime<Utc>;

/// Builds a [`Timestamp`] from epoch milliseconds.
pub fn timestamp_from_millis(millis: i64) -> Result<Timestamp> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| BritError::MalformedMessage(format!("timestamp out of range: {}", millis)))
}

// ═══════════════════════════════════════════════════════════════════════════════
// PAYER IDENTIFIER
// ═══════════════════════════════════════════════════════════════════════════════

/// Fixed-width opaque identifier derived from the wallet seed.
///
/// The same wallet always yields the same identifier, which lets the
/// Matcher recognise a returning payer without learning anything about the
/// wallet itself.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PayerId([u8; PAYER_ID_SIZE]);

impl PayerId {
    /// Wraps raw identifier bytes.
    pub fn from_array(bytes: [u8; PAYER_ID_SIZE]) -> Self {
        Self(bytes)
    }

    /// Parses an identifier from a slice of exactly `PAYER_ID_SIZE` bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; PAYER_ID_SIZE] = bytes.try_into().map_err(|_| {
            BritError::MalformedMessage(format!(
                "payer id must be {} bytes, got {}",
                PAYER_ID_SIZE,
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8; PAYER_ID_SIZE] {
        &self.0
    }

    /// Returns the lowercase hex form used on the wire.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses the hex form used on the wire.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s)
            .map_err(|e| BritError::MalformedMessage(format!("payer id is not hex: {}", e)))?;
        Self::from_bytes(&bytes)
    }
}

impl std::fmt::Debug for PayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PayerId({})", self.to_hex())
    }
}

impl std::fmt::Display for PayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PAYER REQUEST
// ═══════════════════════════════════════════════════════════════════════════════

/// Request sent by a wallet to the Matcher.
///
/// The date slot carries the replay date the payer last received from the
/// Matcher; on first contact it is absent (or the wallet's first transaction
/// date).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PayerRequest {
    /// Wire version
    pub version: u32,
    /// Seed-derived identifier of the paying wallet
    pub payer_id: PayerId,
    /// Date bounding which activations the payer has already seen
    pub first_transaction_date: Option<Timestamp>,
    /// Public key the Matcher must encrypt its response to
    pub reply_key: KemPublicKey,
}

impl PayerRequest {
    /// Creates a request at the current protocol version.
    pub fn new(
        payer_id: PayerId,
        first_transaction_date: Option<Timestamp>,
        reply_key: KemPublicKey,
    ) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            payer_id,
            first_transaction_date,
            reply_key,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MATCHER RESPONSE
// ═══════════════════════════════════════════════════════════════════════════════

/// Response returned by the Matcher.
///
/// An absent replay date means "valid since all time". An empty address
/// list means "no allocation this cycle" and is not an error.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatcherResponse {
    /// Wire version
    pub version: u32,
    /// Replay date the payer should cite next time
    pub replay_date: Option<Timestamp>,
    /// Ordered payee addresses
    pub address_list: Vec<String>,
}

impl MatcherResponse {
    /// Creates a response at the current protocol version.
    pub fn new(replay_date: Option<Timestamp>, address_list: Vec<String>) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            replay_date,
            address_list,
        }
    }

    /// Response carrying nothing this cycle.
    pub fn empty() -> Self {
        Self::new(None, Vec::new())
    }

    /// Returns true when the Matcher allocated no addresses.
    pub fn is_empty(&self) -> bool {
        self.address_list.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ALLOCATION RESULT
// ═══════════════════════════════════════════════════════════════════════════════

/// What wallet code gets back from a successful exchange.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressAllocation {
    /// Addresses to pay fees to this cycle
    pub addresses: Vec<String>,
    /// Replay date to attach to the next request
    pub replay_date: Option<Timestamp>,
}

impl From<MatcherResponse> for AddressAllocation {
    fn from(response: MatcherResponse) -> Self {
        Self {
            addresses: response.address_list,
            replay_date: response.replay_date,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// POOL ADDRESS
// ═══════════════════════════════════════════════════════════════════════════════

/// An address held by the Matcher's pool together with its activation time.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoolAddress {
    /// The payee address string
    pub address: String,
    /// When the address became available for allocation
    pub activated_at: Timestamp,
}

impl PoolAddress {
    /// Creates a pool address.
    pub fn new(address: impl Into<String>, activated_at: Timestamp) -> Self {
        Self {
            address: address.into(),
            activated_at,
        }
    }
}
