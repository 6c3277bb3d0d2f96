//! Payer identifier derivation.
//!
//! ```text
//! payer_id = SHAKE256(DOMAIN_PAYER_ID || seed)[..20]
//! ```
//!
//! The identifier is stable for a wallet (same seed, same id) and reveals
//! nothing about the seed or the wallet's keys.

use brit_core::constants::{DOMAIN_PAYER_ID, PAYER_ID_SIZE};
use brit_core::error::{BritError, Result};
use brit_core::types::PayerId;

use crate::hash::shake256;

/// Shortest seed accepted (BIP39 seeds are 64 bytes, raw entropy 16+).
pub const MIN_SEED_SIZE: usize = 16;

/// Derives the payer identifier for a wallet seed.
///
/// # Errors
/// [`BritError::ConfigError`] if the seed is shorter than [`MIN_SEED_SIZE`].
pub fn derive_payer_id(seed: &[u8]) -> Result<PayerId> {
    if seed.len() < MIN_SEED_SIZE {
        return Err(BritError::ConfigError(format!(
            "wallet seed must be at least {} bytes, got {}",
            MIN_SEED_SIZE,
            seed.len()
        )));
    }

    let digest = shake256(DOMAIN_PAYER_ID, seed, PAYER_ID_SIZE);
    PayerId::from_bytes(&digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{RngCore, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    fn seed(n: u64) -> [u8; 64] {
        let mut rng = ChaCha20Rng::seed_from_u64(n);
        let mut seed = [0u8; 64];
        rng.fill_bytes(&mut seed);
        seed
    }

    #[test]
    fn test_same_seed_same_id() {
        assert_eq!(derive_payer_id(&seed(1)).unwrap(), derive_payer_id(&seed(1)).unwrap());
    }

    #[test]
    fn test_different_seeds_different_ids() {
        assert_ne!(derive_payer_id(&seed(1)).unwrap(), derive_payer_id(&seed(2)).unwrap());
    }

    #[test]
    fn test_fixed_width() {
        let id = derive_payer_id(&seed(3)).unwrap();
        assert_eq!(id.as_bytes().len(), PAYER_ID_SIZE);
        assert_eq!(id.to_hex().len(), PAYER_ID_SIZE * 2);
    }

    #[test]
    fn test_short_seed_rejected() {
        assert!(matches!(derive_payer_id(&[1u8; 8]), Err(BritError::ConfigError(_))));
    }

    #[test]
    fn test_id_is_not_a_seed_prefix() {
        let s = seed(4);
        let id = derive_payer_id(&s).unwrap();
        assert_ne!(&id.as_bytes()[..], &s[..PAYER_ID_SIZE]);
    }
}
