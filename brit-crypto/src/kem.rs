//! ML-KEM-768 key encapsulation mechanism.
//!
//! This module wraps the RustCrypto `ml-kem` crate behind the byte-oriented
//! key types of `brit-core`.
//!
//! ## Security Level
//!
//! ML-KEM-768 provides approximately 192 bits of classical security and
//! 128+ bits of quantum security.

use ml_kem::kem::{Decapsulate, Encapsulate};
use ml_kem::{Ciphertext, EncodedSizeUser, KemCore, MlKem768};
use zeroize::Zeroize;

use brit_core::constants::{
    KEM_CIPHERTEXT_SIZE, KEM_PUBLIC_KEY_SIZE, KEM_SECRET_KEY_SIZE, KEM_SHARED_SECRET_SIZE,
};
use brit_core::error::{BritError, Result};
use brit_core::types::{KemPublicKey, KemSecretKey, KeyPair};

type EncapsulationKey = <MlKem768 as KemCore>::EncapsulationKey;
type DecapsulationKey = <MlKem768 as KemCore>::DecapsulationKey;

// ═══════════════════════════════════════════════════════════════════════════════
// CIPHERTEXT TYPE
// ═══════════════════════════════════════════════════════════════════════════════

/// ML-KEM ciphertext (encapsulated key), carried at the front of every envelope.
#[derive(Clone, PartialEq, Eq)]
pub struct KemCiphertext {
    bytes: Vec<u8>,
}

impl KemCiphertext {
    /// Creates ciphertext from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KEM_CIPHERTEXT_SIZE {
            return Err(BritError::InvalidKeySize {
                expected: KEM_CIPHERTEXT_SIZE,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            bytes: bytes.to_vec(),
        })
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for KemCiphertext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KemCiphertext({} bytes)", self.bytes.len())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// KEY GENERATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Generates a new ML-KEM-768 key pair from the thread-local CSPRNG.
pub fn generate_keypair() -> KeyPair {
    let (dk, ek) = MlKem768::generate(&mut rand::thread_rng());

    let public = KemPublicKey::from_bytes(&ek.as_bytes())
        .expect("ML-KEM-768 encapsulation key should be 1184 bytes");

    let mut secret_bytes = dk.as_bytes();
    let secret = KemSecretKey::from_bytes(&secret_bytes)
        .expect("ML-KEM-768 decapsulation key should be 2400 bytes");
    secret_bytes.as_mut_slice().zeroize();

    KeyPair::new(public, secret)
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENCAPSULATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Encapsulates a fresh shared secret to `public_key`.
///
/// Returns the ciphertext to transmit and the 32-byte shared secret.
pub fn encapsulate(
    public_key: &KemPublicKey,
) -> Result<(KemCiphertext, [u8; KEM_SHARED_SECRET_SIZE])> {
    let encoded = public_key
        .as_bytes()
        .try_into()
        .map_err(|_| BritError::InvalidKeySize {
            expected: KEM_PUBLIC_KEY_SIZE,
            actual: public_key.as_bytes().len(),
        })?;
    let ek = EncapsulationKey::from_bytes(&encoded);

    let (ct, ss) = ek
        .encapsulate(&mut rand::thread_rng())
        .map_err(|_| BritError::EncryptionFailure("ML-KEM encapsulation failed".into()))?;

    let mut shared_secret = [0u8; KEM_SHARED_SECRET_SIZE];
    shared_secret.copy_from_slice(&ss);

    Ok((KemCiphertext::from_bytes(&ct)?, shared_secret))
}

// ═══════════════════════════════════════════════════════════════════════════════
// DECAPSULATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Recovers the shared secret from `ciphertext`.
///
/// ML-KEM uses implicit rejection: a ciphertext made for another key yields
/// an unrelated pseudo-random secret rather than an error. Callers detect
/// the mismatch when the secret fails to authenticate anything.
pub fn decapsulate(
    ciphertext: &KemCiphertext,
    secret_key: &KemSecretKey,
) -> Result<[u8; KEM_SHARED_SECRET_SIZE]> {
    let mut encoded = secret_key
        .as_bytes()
        .try_into()
        .map_err(|_| BritError::InvalidKeySize {
            expected: KEM_SECRET_KEY_SIZE,
            actual: secret_key.as_bytes().len(),
        })?;
    let dk = DecapsulationKey::from_bytes(&encoded);
    Zeroize::zeroize(encoded.as_mut_slice());

    let ct: Ciphertext<MlKem768> = ciphertext
        .as_bytes()
        .try_into()
        .map_err(|_| BritError::DecryptionFailure)?;

    let ss = dk
        .decapsulate(&ct)
        .map_err(|_| BritError::DecryptionFailure)?;

    let mut shared_secret = [0u8; KEM_SHARED_SECRET_SIZE];
    shared_secret.copy_from_slice(&ss);
    Ok(shared_secret)
}

/// Verifies that a key pair's halves belong together.
pub fn verify_keypair(keypair: &KeyPair) -> Result<bool> {
    let (ciphertext, sender_secret) = encapsulate(&keypair.public)?;
    let receiver_secret = decapsulate(&ciphertext, &keypair.secret)?;

    Ok(subtle::ConstantTimeEq::ct_eq(&sender_secret[..], &receiver_secret[..]).into())
}
