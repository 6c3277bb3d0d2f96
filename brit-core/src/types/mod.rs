//! Domain types for BRIT.
//!
//! - [`KeyPair`]: ML-KEM public/secret key pair
//! - [`PayerRequest`]: Wallet-to-Matcher request
//! - [`MatcherResponse`]: Matcher-to-wallet response
//! - [`PoolAddress`]: Pool entry with its activation time

mod keys;
mod message;

pub use keys::*;
pub use message::*;
