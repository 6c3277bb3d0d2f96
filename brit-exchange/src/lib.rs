//! # BRIT Exchange
//!
//! Both ends of one address exchange.
//!
//! - **Payer**: [`PayerRequestBuilder`] builds a request, encrypts it to the
//!   Matcher, posts it over a [`Transport`] and decrypts the response with a
//!   per-exchange reply key.
//! - **Matcher**: [`MatcherResponder`] decrypts a request, runs the
//!   allocation policy against its pool and encrypts the response back to
//!   the payer's reply key.
//!
//! Every exchange is a single request/response. A failure at any step ends
//! the exchange; retrying is the caller's business.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use brit_exchange::PayerRequestBuilder;
//!
//! let allocation = PayerRequestBuilder::new(cipher, matcher_public_key)
//!     .payer_id(payer_id)
//!     .replay_date(stored_replay_date)
//!     .build()?
//!     .send(&transport)
//!     .await?;
//! ```
//!
//! [`Transport`]: brit_core::traits::Transport

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod local;
pub mod matcher;
pub mod payer;

pub use local::LocalTransport;
pub use matcher::{MatcherResponder, MatcherStage};
pub use payer::{ExchangeState, PayerExchange, PayerRequestBuilder};
