//! Hybrid encryption envelope.
//!
//! A fresh AES-256-GCM session key encrypts the payload; only that 32-byte
//! key is wrapped for the recipient, via an ML-KEM-768 encapsulation whose
//! shared secret is stretched into a key-encryption key.
//!
//! ## Wire Format
//!
//! ```text
//! magic "BRIT" (4) || format version (1)
//! || kem_ct_len u16 BE || kem_ct
//! || wrap_nonce (12) || wrapped_len u16 BE || wrapped_key
//! || payload_nonce (12) || payload_len u32 BE || payload_ct
//! ```
//!
//! The wrapped key is authenticated together with everything before it, and
//! the payload together with the whole header, so flipping any bit of the
//! blob makes decryption fail.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::RngCore;
use tracing::debug;
use zeroize::{Zeroize, Zeroizing};

use brit_core::constants::{
    AEAD_NONCE_SIZE, AEAD_TAG_SIZE, DOMAIN_KEY_WRAP, ENVELOPE_MAGIC, ENVELOPE_VERSION,
    KEM_CIPHERTEXT_SIZE, SESSION_KEY_SIZE,
};
use brit_core::error::{BritError, Result};
use brit_core::traits::HybridCipher;
use brit_core::types::{KemPublicKey, KemSecretKey, KeyPair};

use crate::hash::shake256_multi;
use crate::kem::{self, KemCiphertext};

const WRAPPED_KEY_SIZE: usize = SESSION_KEY_SIZE + AEAD_TAG_SIZE;

/// Bytes preceding the payload ciphertext.
pub const ENVELOPE_HEADER_SIZE: usize = ENVELOPE_MAGIC.len()
    + 1
    + 2
    + KEM_CIPHERTEXT_SIZE
    + AEAD_NONCE_SIZE
    + 2
    + WRAPPED_KEY_SIZE
    + AEAD_NONCE_SIZE
    + 4;

// ═══════════════════════════════════════════════════════════════════════════════
// ENCRYPT
// ═══════════════════════════════════════════════════════════════════════════════

/// Encrypts `plaintext` for the holder of `recipient`'s secret key.
///
/// # Errors
/// [`BritError::EncryptionFailure`] if the payload is too large to frame or
/// the AEAD refuses it.
pub fn encrypt(plaintext: &[u8], recipient: &KemPublicKey) -> Result<Vec<u8>> {
    let mut rng = rand::thread_rng();

    let payload_len = u32::try_from(plaintext.len() + AEAD_TAG_SIZE)
        .map_err(|_| BritError::EncryptionFailure("payload too large".into()))?;

    let mut session_key = Zeroizing::new([0u8; SESSION_KEY_SIZE]);
    rng.fill_bytes(&mut session_key[..]);

    let (kem_ct, mut shared_secret) = kem::encapsulate(recipient)?;
    let kek = Zeroizing::new(derive_kek(&shared_secret, &kem_ct));
    shared_secret.zeroize();

    let mut out = Vec::with_capacity(ENVELOPE_HEADER_SIZE + payload_len as usize);
    out.extend_from_slice(ENVELOPE_MAGIC);
    out.push(ENVELOPE_VERSION);
    out.extend_from_slice(&(KEM_CIPHERTEXT_SIZE as u16).to_be_bytes());
    out.extend_from_slice(kem_ct.as_bytes());

    let wrap_nonce = random_nonce(&mut rng);
    let wrapped = seal(&kek, &wrap_nonce, &session_key[..], &out)?;
    out.extend_from_slice(&wrap_nonce);
    out.extend_from_slice(&(wrapped.len() as u16).to_be_bytes());
    out.extend_from_slice(&wrapped);

    let payload_nonce = random_nonce(&mut rng);
    out.extend_from_slice(&payload_nonce);
    out.extend_from_slice(&payload_len.to_be_bytes());
    let ciphertext = seal(&session_key[..], &payload_nonce, plaintext, &out)?;
    out.extend_from_slice(&ciphertext);

    debug!(plaintext_len = plaintext.len(), blob_len = out.len(), "Sealed envelope");
    Ok(out)
}

// ═══════════════════════════════════════════════════════════════════════════════
// DECRYPT
// ═══════════════════════════════════════════════════════════════════════════════

/// Decrypts and authenticates an envelope.
///
/// # Errors
/// [`BritError::DecryptionFailure`] for every kind of failure: bad framing,
/// wrong key, or a failed authentication tag.
pub fn decrypt(blob: &[u8], secret: &KemSecretKey) -> Result<Vec<u8>> {
    let mut reader = FrameReader::new(blob);

    if reader.take(ENVELOPE_MAGIC.len())? != ENVELOPE_MAGIC {
        return Err(BritError::DecryptionFailure);
    }
    if reader.take(1)?[0] != ENVELOPE_VERSION {
        return Err(BritError::DecryptionFailure);
    }
    let kem_ct_len = reader.read_u16()? as usize;
    if kem_ct_len != KEM_CIPHERTEXT_SIZE {
        return Err(BritError::DecryptionFailure);
    }
    let kem_ct = KemCiphertext::from_bytes(reader.take(kem_ct_len)?)
        .map_err(|_| BritError::DecryptionFailure)?;
    let wrap_aad_end = reader.position();

    let wrap_nonce = reader.take(AEAD_NONCE_SIZE)?;
    let wrapped_len = reader.read_u16()? as usize;
    if wrapped_len != WRAPPED_KEY_SIZE {
        return Err(BritError::DecryptionFailure);
    }
    let wrapped = reader.take(wrapped_len)?;

    let payload_nonce = reader.take(AEAD_NONCE_SIZE)?;
    let payload_len = reader.read_u32()? as usize;
    let payload_aad_end = reader.position();
    if reader.remaining() != payload_len {
        return Err(BritError::DecryptionFailure);
    }
    let payload = reader.take(payload_len)?;

    let mut shared_secret = kem::decapsulate(&kem_ct, secret)?;
    let kek = Zeroizing::new(derive_kek(&shared_secret, &kem_ct));
    shared_secret.zeroize();

    let session_key = Zeroizing::new(open(&kek, wrap_nonce, wrapped, &blob[..wrap_aad_end])?);
    if session_key.len() != SESSION_KEY_SIZE {
        return Err(BritError::DecryptionFailure);
    }

    open(&session_key, payload_nonce, payload, &blob[..payload_aad_end])
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROVIDER
// ═══════════════════════════════════════════════════════════════════════════════

/// [`HybridCipher`] backed by ML-KEM-768 and AES-256-GCM.
#[derive(Clone, Copy, Debug, Default)]
pub struct MlKemEnvelope;

impl HybridCipher for MlKemEnvelope {
    fn generate_keypair(&self) -> KeyPair {
        kem::generate_keypair()
    }

    fn encrypt_hybrid(&self, plaintext: &[u8], recipient: &KemPublicKey) -> Result<Vec<u8>> {
        encrypt(plaintext, recipient)
    }

    fn decrypt_hybrid(&self, blob: &[u8], secret: &KemSecretKey) -> Result<Vec<u8>> {
        decrypt(blob, secret)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

fn derive_kek(shared_secret: &[u8], kem_ct: &KemCiphertext) -> Vec<u8> {
    shake256_multi(DOMAIN_KEY_WRAP, &[shared_secret, kem_ct.as_bytes()], SESSION_KEY_SIZE)
}

fn random_nonce(rng: &mut impl RngCore) -> [u8; AEAD_NONCE_SIZE] {
    let mut nonce = [0u8; AEAD_NONCE_SIZE];
    rng.fill_bytes(&mut nonce);
    nonce
}

fn seal(key: &[u8], nonce: &[u8], msg: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|_| BritError::EncryptionFailure("invalid AES-256 key length".into()))?;
    cipher
        .encrypt(Nonce::from_slice(nonce), Payload { msg, aad })
        .map_err(|_| BritError::EncryptionFailure("AES-GCM seal failed".into()))
}

fn open(key: &[u8], nonce: &[u8], msg: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| BritError::DecryptionFailure)?;
    cipher
        .decrypt(Nonce::from_slice(nonce), Payload { msg, aad })
        .map_err(|_| BritError::DecryptionFailure)
}

/// Bounds-checked cursor; running off the end is a decryption failure.
struct FrameReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> FrameReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).ok_or(BritError::DecryptionFailure)?;
        let slice = self.bytes.get(self.pos..end).ok_or(BritError::DecryptionFailure)?;
        self.pos = end;
        Ok(slice)
    }

    fn read_u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn read_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }
}
