//! Key types for BRIT.
//!
//! - [`KemPublicKey`]: Public key for encapsulation (1184 bytes)
//! - [`KemSecretKey`]: Secret key for decapsulation (2400 bytes, zeroized on drop)
//! - [`KeyPair`]: Combined public + secret key
//!
//! The Matcher publishes a long-lived public key; payers generate a
//! throwaway reply pair for every exchange.

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::constants::{KEM_PUBLIC_KEY_SIZE, KEM_SECRET_KEY_SIZE};
use crate::error::{BritError, Result};

// ═══════════════════════════════════════════════════════════════════════════════
// PUBLIC KEY
// ═══════════════════════════════════════════════════════════════════════════════

/// ML-KEM-768 public key (encapsulation key).
#[derive(Clone, PartialEq, Eq)]
pub struct KemPublicKey {
    bytes: [u8; KEM_PUBLIC_KEY_SIZE],
}

impl KemPublicKey {
    /// Creates a new public key from raw bytes.
    ///
    /// # Errors
    /// Returns error if bytes length doesn't match `KEM_PUBLIC_KEY_SIZE`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KEM_PUBLIC_KEY_SIZE {
            return Err(BritError::InvalidKeySize {
                expected: KEM_PUBLIC_KEY_SIZE,
                actual: bytes.len(),
            });
        }

        let mut arr = [0u8; KEM_PUBLIC_KEY_SIZE];
        arr.copy_from_slice(bytes);
        Ok(Self { bytes: arr })
    }

    /// Creates a public key from a fixed-size array.
    pub fn from_array(bytes: [u8; KEM_PUBLIC_KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Returns the raw bytes of the public key.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the hex-encoded public key.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Creates a public key from hex string (surrounding whitespace ignored).
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim())?;
        Self::from_bytes(&bytes)
    }
}

impl std::fmt::Debug for KemPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "KemPublicKey({}...{})",
            hex::encode(&self.bytes[..8]),
            hex::encode(&self.bytes[KEM_PUBLIC_KEY_SIZE - 8..])
        )
    }
}

impl Serialize for KemPublicKey {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for KemPublicKey {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SECRET KEY
// ═══════════════════════════════════════════════════════════════════════════════

/// ML-KEM-768 secret key (decapsulation key).
///
/// Zeroized on drop. Never expose this key in logs or error messages.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct KemSecretKey {
    bytes: [u8; KEM_SECRET_KEY_SIZE],
}

impl KemSecretKey {
    /// Creates a new secret key from raw bytes.
    ///
    /// # Errors
    /// Returns error if bytes length doesn't match `KEM_SECRET_KEY_SIZE`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KEM_SECRET_KEY_SIZE {
            return Err(BritError::InvalidKeySize {
                expected: KEM_SECRET_KEY_SIZE,
                actual: bytes.len(),
            });
        }

        let mut arr = [0u8; KEM_SECRET_KEY_SIZE];
        arr.copy_from_slice(bytes);
        Ok(Self { bytes: arr })
    }

    /// Creates a secret key from a fixed-size array.
    pub fn from_array(bytes: [u8; KEM_SECRET_KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Returns the raw bytes of the secret key.
    ///
    /// # Security
    /// Handle the returned bytes carefully - do not log or expose them.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the hex-encoded secret key, for writing key files.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Creates a secret key from hex string (surrounding whitespace ignored).
    pub fn from_hex(s: &str) -> Result<Self> {
        let mut bytes = hex::decode(s.trim())?;
        let key = Self::from_bytes(&bytes);
        bytes.zeroize();
        key
    }
}

impl std::fmt::Debug for KemSecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KemSecretKey([REDACTED])")
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// KEY PAIR
// ═══════════════════════════════════════════════════════════════════════════════

/// A complete ML-KEM-768 key pair (public + secret).
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct KeyPair {
    /// Public key (safe to share)
    #[zeroize(skip)]
    pub public: KemPublicKey,
    /// Secret key (keep private, auto-zeroized)
    pub secret: KemSecretKey,
}

impl KeyPair {
    /// Creates a new key pair from public and secret keys.
    pub fn new(public: KemPublicKey, secret: KemSecretKey) -> Self {
        Self { public, secret }
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}
