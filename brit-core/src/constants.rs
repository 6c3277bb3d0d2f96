//! Protocol constants for BRIT.
//!
//! Key and ciphertext sizes are those of ML-KEM-768 (NIST FIPS 203), which
//! wraps the per-message session key of every envelope.

// ═══════════════════════════════════════════════════════════════════════════════
// ML-KEM-768 SIZES (NIST FIPS 203)
// ═══════════════════════════════════════════════════════════════════════════════

/// Size of an ML-KEM-768 public key (encapsulation key) in bytes.
pub const KEM_PUBLIC_KEY_SIZE: usize = 1184;

/// Size of an ML-KEM-768 secret key (decapsulation key) in bytes.
pub const KEM_SECRET_KEY_SIZE: usize = 2400;

/// Size of an ML-KEM-768 ciphertext in bytes.
pub const KEM_CIPHERTEXT_SIZE: usize = 1088;

/// Size of the shared secret produced by encapsulation.
pub const KEM_SHARED_SECRET_SIZE: usize = 32;

// ═══════════════════════════════════════════════════════════════════════════════
// SYMMETRIC ENVELOPE
// ═══════════════════════════════════════════════════════════════════════════════

/// Size of the random AES-256-GCM session key generated per message.
pub const SESSION_KEY_SIZE: usize = 32;

/// AES-GCM nonce size.
pub const AEAD_NONCE_SIZE: usize = 12;

/// AES-GCM authentication tag size.
pub const AEAD_TAG_SIZE: usize = 16;

/// Magic bytes opening every encrypted envelope.
pub const ENVELOPE_MAGIC: &[u8; 4] = b"BRIT";

/// Envelope framing version.
pub const ENVELOPE_VERSION: u8 = 1;

// ═══════════════════════════════════════════════════════════════════════════════
// DOMAIN SEPARATORS
// ═══════════════════════════════════════════════════════════════════════════════
// Each SHAKE256 invocation uses its own domain separator so outputs from
// different operations never collide, even with the same input.

/// Domain separator for deriving the key-encryption key from a KEM secret.
pub const DOMAIN_KEY_WRAP: &[u8] = b"BRIT_KEY_WRAP_V1";

/// Domain separator for deriving a payer identifier from a wallet seed.
pub const DOMAIN_PAYER_ID: &[u8] = b"BRIT_PAYER_ID_V1";

// ═══════════════════════════════════════════════════════════════════════════════
// WIRE FORMAT
// ═══════════════════════════════════════════════════════════════════════════════

/// The only message version this code understands.
pub const PROTOCOL_VERSION: u32 = 1;

/// Row separator of the wire format.
pub const WIRE_SEPARATOR: char = '\n';

/// Literal written in the date row when no date is present.
pub const DATE_NOT_PRESENT: &str = "not-present";

/// Width of a payer identifier in bytes.
pub const PAYER_ID_SIZE: usize = 20;

// ═══════════════════════════════════════════════════════════════════════════════
// DEPLOYMENT DEFAULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Default number of addresses in a cohort.
pub const DEFAULT_COHORT_SIZE: usize = 4;

/// Default cadence at which the Matcher advances its cohort.
pub const DEFAULT_ROTATION_SECS: u64 = 24 * 60 * 60;

/// Default Matcher endpoint path.
pub const MATCHER_PATH: &str = "/brit";

/// Content type for envelope bodies.
pub const ENVELOPE_CONTENT_TYPE: &str = "application/octet-stream";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kem_sizes_match_fips203() {
        // These sizes are defined by NIST FIPS 203 for ML-KEM-768
        assert_eq!(KEM_PUBLIC_KEY_SIZE, 1184);
        assert_eq!(KEM_SECRET_KEY_SIZE, 2400);
        assert_eq!(KEM_CIPHERTEXT_SIZE, 1088);
        assert_eq!(KEM_SHARED_SECRET_SIZE, 32);
    }

    #[test]
    fn test_domain_separators_unique() {
        assert_ne!(DOMAIN_KEY_WRAP, DOMAIN_PAYER_ID);
    }

    #[test]
    fn test_session_key_matches_aes256() {
        assert_eq!(SESSION_KEY_SIZE, 32);
        assert_eq!(AEAD_NONCE_SIZE, 12);
    }
}
