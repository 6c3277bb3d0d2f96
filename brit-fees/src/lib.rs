//! # BRIT Fees
//!
//! Wallet-side facade over the address exchange.
//!
//! - [`FeeService`]: requests addresses, retries transient failures,
//!   persists the replay date and tracks when a fee payment is due
//! - [`ReplayDateStore`] implementations: memory and JSON file
//! - [`RetryPolicy`]: bounded exponential backoff with jitter
//!
//! Nothing in this crate ever fails the wallet's own operation: refresh
//! failures are logged and swallowed.
//!
//! [`ReplayDateStore`]: brit_core::traits::ReplayDateStore

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod backoff;
mod config;
mod schedule;
mod service;
mod store;

pub use backoff::RetryPolicy;
pub use config::FeeConfig;
pub use schedule::{FeePayment, FeeState};
pub use service::FeeService;
pub use store::{FileReplayStore, MemoryReplayStore};
