//! # BRIT Core
//!
//! Core types, errors, and traits for the BRIT address exchange between a
//! paying wallet and the Matcher.
//!
//! This crate provides the foundational building blocks used by all other BRIT crates:
//!
//! - **Types**: Payer requests, Matcher responses, keys and pool addresses
//! - **Wire**: The flat, versioned, newline-delimited message codec
//! - **Errors**: A single error hierarchy with retry classification
//! - **Constants**: Protocol constants and sizes
//! - **Traits**: Collaborator seams (crypto provider, address pool, transport, replay store)
//!
//! ## Example
//!
//! ```rust
//! use brit_core::{MatcherResponse, wire};
//!
//! let response = MatcherResponse::new(None, vec!["1Addr".into()]);
//! let bytes = wire::encode_response(&response);
//! assert_eq!(wire::decode_response(&bytes).unwrap(), response);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;
pub mod wire;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::{BritError, Result};
pub use traits::*;
pub use types::*;
