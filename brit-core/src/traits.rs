//! Collaborator traits for BRIT.
//!
//! Every external dependency of the exchange is injected through one of
//! these seams, so tests and alternative deployments can swap them freely.

use async_trait::async_trait;
use chrono::Utc;

use crate::error::Result;
use crate::types::{KemPublicKey, KemSecretKey, KeyPair, PoolAddress, Timestamp};

// ═══════════════════════════════════════════════════════════════════════════════
// CRYPTO PROVIDER
// ═══════════════════════════════════════════════════════════════════════════════

/// Hybrid public-key encryption of arbitrary-length payloads.
pub trait HybridCipher: Send + Sync {
    /// Generates a fresh recipient key pair.
    fn generate_keypair(&self) -> KeyPair;

    /// Encrypts `plaintext` so that only the holder of the matching secret
    /// key can read it.
    fn encrypt_hybrid(&self, plaintext: &[u8], recipient: &KemPublicKey) -> Result<Vec<u8>>;

    /// Decrypts and authenticates a blob produced by [`encrypt_hybrid`].
    ///
    /// Fails with `DecryptionFailure` on any key mismatch or tampering and
    /// never returns unauthenticated data.
    ///
    /// [`encrypt_hybrid`]: HybridCipher::encrypt_hybrid
    fn decrypt_hybrid(&self, blob: &[u8], secret: &KemSecretKey) -> Result<Vec<u8>>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// ADDRESS POOL
// ═══════════════════════════════════════════════════════════════════════════════

/// Source of payee addresses on the Matcher side.
///
/// Implementations must make every cohort transition visible atomically:
/// a reader observes either the old cohort or the new one, never a mix.
pub trait AddressPool: Send + Sync {
    /// The current cohort: the small rotating set handed to every payer.
    fn current_cohort(&self) -> Vec<PoolAddress>;

    /// Addresses activated strictly after `since` and no later than `until`,
    /// ordered by activation time.
    fn activated_since(&self, since: Timestamp, until: Timestamp) -> Vec<PoolAddress>;

    /// Newest activation timestamp at or before `until`, if any.
    fn latest_activation(&self, until: Timestamp) -> Option<Timestamp>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRANSPORT
// ═══════════════════════════════════════════════════════════════════════════════

/// Opaque-bytes request/response channel to the Matcher.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Posts `body` and returns the response body.
    ///
    /// Network errors, timeouts and non-success statuses all surface as
    /// `TransportFailure`.
    async fn post(&self, body: Vec<u8>) -> Result<Vec<u8>>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// REPLAY DATE STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// Persistence for the most recent replay date a payer received.
#[async_trait]
pub trait ReplayDateStore: Send + Sync {
    /// Loads the stored replay date.
    async fn load(&self) -> Result<Option<Timestamp>>;

    /// Replaces the stored replay date.
    async fn save(&self, replay_date: Option<Timestamp>) -> Result<()>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// CLOCK
// ═══════════════════════════════════════════════════════════════════════════════

/// Source of "now" for allocation decisions.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> Timestamp;
}

/// Wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// Clock frozen at one instant (tests, replays).
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub Timestamp);

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}
