//! Hashing utilities with domain separation.
//!
//! This module provides SHAKE256 (extendable-output function) with domain
//! separation so different protocol components never produce colliding
//! outputs.
//!
//! ```text
//! output = SHAKE256(len(domain) || domain || input, output_length)
//! ```

use sha3::{Shake256, digest::{Update, ExtendableOutput, XofReader}};

/// Computes SHAKE256 hash with domain separation.
///
/// # Arguments
///
/// * `domain` - Domain separator bytes (unique per use case)
/// * `input` - Input data to hash
/// * `output_len` - Desired output length in bytes
pub fn shake256(domain: &[u8], input: &[u8], output_len: usize) -> Vec<u8> {
    let mut hasher = Shake256::default();

    // Domain separation: prepend domain with length prefix
    hasher.update(&(domain.len() as u32).to_le_bytes());
    hasher.update(domain);

    hasher.update(input);

    let mut reader = hasher.finalize_xof();
    let mut output = vec![0u8; output_len];
    reader.read(&mut output);

    output
}

/// Computes SHAKE256 hash over several inputs.
///
/// Each input is length-prefixed, so `["ab", "c"]` and `["a", "bc"]` hash
/// differently.
pub fn shake256_multi(domain: &[u8], inputs: &[&[u8]], output_len: usize) -> Vec<u8> {
    let mut hasher = Shake256::default();

    hasher.update(&(domain.len() as u32).to_le_bytes());
    hasher.update(domain);

    for input in inputs {
        hasher.update(&(input.len() as u64).to_le_bytes());
        hasher.update(input);
    }

    let mut reader = hasher.finalize_xof();
    let mut output = vec![0u8; output_len];
    reader.read(&mut output);

    output
}
