//! # BRIT Cryptography
//!
//! Cryptographic primitives for the BRIT address exchange.
//!
//! This crate provides:
//!
//! - **KEM**: ML-KEM-768 key generation, encapsulation, decapsulation
//! - **Hash**: SHAKE256 with domain separation
//! - **Envelope**: Hybrid encryption of arbitrary-length payloads
//! - **Payer id**: Deterministic wallet identifier derivation
//!
//! ## Security Properties
//!
//! - Only a fixed-size session key is ever wrapped asymmetrically
//! - Every envelope is authenticated end to end; tampering yields
//!   `DecryptionFailure` and no plaintext
//! - Secret material is zeroized after use
//!
//! ## Example
//!
//! ```rust,ignore
//! use brit_crypto::{decrypt, encrypt, generate_keypair};
//!
//! let matcher = generate_keypair();
//! let blob = encrypt(b"1\nnot-present\n", &matcher.public)?;
//! assert_eq!(decrypt(&blob, &matcher.secret)?, b"1\nnot-present\n");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod envelope;
pub mod hash;
pub mod kem;
pub mod payer_id;

// Re-export main functions at crate root
pub use envelope::{decrypt, encrypt, MlKemEnvelope};
pub use hash::{shake256, shake256_multi};
pub use kem::{decapsulate, encapsulate, generate_keypair, KemCiphertext};
pub use payer_id::derive_payer_id;
