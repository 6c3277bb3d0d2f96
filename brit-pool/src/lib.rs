//! # BRIT Pool
//!
//! Matcher-side address storage and the allocation policy that decides which
//! addresses a payer receives.
//!
//! This crate provides:
//!
//! - **Allocation**: the pure replay-date policy ([`allocate`])
//! - **Memory**: thread-safe in-memory pool with explicit cohort rotation
//! - **File**: the memory pool plus JSON snapshots on disk
//!
//! ## Example
//!
//! ```rust,ignore
//! use brit_pool::{allocate, MemoryAddressPool, PoolConfig};
//!
//! let pool = MemoryAddressPool::new(PoolConfig::default().with_cohort_size(1));
//! pool.activate("1Addr...", t100)?;
//! pool.rotate_cohort(t100);
//!
//! let response = allocate(&pool, None, now);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod allocation;
mod config;
mod file;
mod memory;

pub use allocation::allocate;
pub use config::PoolConfig;
pub use file::{load_address_list, parse_address_list, FileAddressPool, PoolSnapshot};
pub use memory::{MemoryAddressPool, PoolStats};

// Re-export the trait from core
pub use brit_core::traits::AddressPool;
