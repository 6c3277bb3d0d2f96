//! In-memory address pool.
//!
//! Fast, thread-safe storage suitable for development, testing,
//! and single-process Matchers.

use std::collections::HashSet;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use brit_core::error::{BritError, Result};
use brit_core::traits::AddressPool;
use brit_core::types::{PoolAddress, Timestamp};

use crate::config::PoolConfig;

/// Longest address string accepted (bech32 addresses top out at 90).
const MAX_ADDRESS_LEN: usize = 128;

/// Snapshot of pool counters, served by the Matcher's stats endpoint.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Addresses ever activated
    pub total_addresses: usize,
    /// Addresses in the current cohort
    pub cohort_size: usize,
    /// Newest activation time
    pub newest_activation: Option<Timestamp>,
    /// When the cohort last rotated
    pub last_rotation: Option<Timestamp>,
    /// Number of rotations since startup
    pub rotations: u64,
}

#[derive(Debug, Default)]
struct PoolState {
    /// Every address, ordered by activation time (ties keep insertion order)
    addresses: Vec<PoolAddress>,
    /// Address strings already present, for duplicate rejection
    known: HashSet<String>,
    cohort: Vec<PoolAddress>,
    last_rotation: Option<Timestamp>,
    rotations: u64,
}

impl PoolState {
    /// Index one past the last address activated at or before `until`.
    fn activated_end(&self, until: Timestamp) -> usize {
        self.addresses.partition_point(|a| a.activated_at <= until)
    }

    fn rotate(&mut self, cohort_size: usize, now: Timestamp) -> Vec<PoolAddress> {
        let end = self.activated_end(now);
        let start = end.saturating_sub(cohort_size);
        self.cohort = self.addresses[start..end].to_vec();
        self.last_rotation = Some(now);
        self.rotations += 1;
        self.cohort.clone()
    }
}

/// In-memory address pool.
///
/// All state lives behind a single lock, so a cohort rotation is observed
/// by concurrent allocations either entirely or not at all.
///
/// # Cohorts
///
/// The cohort only changes on [`rotate_cohort`](Self::rotate_cohort) (or
/// [`rotate_if_due`](Self::rotate_if_due)). Activating an address makes it
/// visible to replay-date queries immediately but does not touch the cohort.
#[derive(Debug)]
pub struct MemoryAddressPool {
    config: PoolConfig,
    state: RwLock<PoolState>,
}

impl MemoryAddressPool {
    /// Creates an empty pool.
    pub fn new(config: PoolConfig) -> Self {
        Self {
            config,
            state: RwLock::new(PoolState::default()),
        }
    }

    /// Returns the pool configuration.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Adds an address that becomes available for allocation at `at`.
    ///
    /// # Errors
    /// [`BritError::InvalidAddress`] for empty, oversized or whitespace
    /// carrying strings, and for addresses already in the pool.
    #[instrument(skip(self, address))]
    pub fn activate(&self, address: impl Into<String>, at: Timestamp) -> Result<()> {
        let address = validate_address(address.into())?;

        let mut state = self.state.write();
        if !state.known.insert(address.clone()) {
            return Err(BritError::InvalidAddress(format!(
                "{} is already in the pool",
                address
            )));
        }

        let index = state.activated_end(at);
        state.addresses.insert(index, PoolAddress::new(address, at));

        debug!(total = state.addresses.len(), "Activated address");
        Ok(())
    }

    /// Activates a batch of addresses, stopping at the first invalid one.
    pub fn import(&self, addresses: Vec<PoolAddress>) -> Result<usize> {
        let mut imported = 0;
        for entry in addresses {
            self.activate(entry.address, entry.activated_at)?;
            imported += 1;
        }
        Ok(imported)
    }

    /// Replaces the cohort with the newest `cohort_size` addresses activated
    /// at or before `now`.
    pub fn rotate_cohort(&self, now: Timestamp) -> Vec<PoolAddress> {
        let cohort = self.state.write().rotate(self.config.cohort_size, now);
        info!(cohort_size = cohort.len(), "Rotated cohort");
        cohort
    }

    /// Rotates if no cohort exists yet or the rotation interval has elapsed.
    ///
    /// Returns whether a rotation happened. The check and the rotation run
    /// under one write lock, so concurrent callers rotate at most once.
    pub fn rotate_if_due(&self, now: Timestamp) -> bool {
        let mut state = self.state.write();
        if !is_due(state.last_rotation, now, &self.config) {
            return false;
        }
        let cohort = state.rotate(self.config.cohort_size, now);
        drop(state);

        info!(cohort_size = cohort.len(), "Rotated cohort on schedule");
        true
    }

    /// Whether a rotation is due at `now`.
    pub fn is_rotation_due(&self, now: Timestamp) -> bool {
        is_due(self.state.read().last_rotation, now, &self.config)
    }

    /// Reinstates a previously persisted cohort.
    ///
    /// # Errors
    /// [`BritError::PoolError`] if a cohort address is not in the pool.
    pub fn restore_cohort(&self, cohort: &[String], last_rotation: Option<Timestamp>) -> Result<()> {
        let mut state = self.state.write();

        let mut restored = Vec::with_capacity(cohort.len());
        for address in cohort {
            let entry = state
                .addresses
                .iter()
                .find(|a| &a.address == address)
                .ok_or_else(|| {
                    BritError::PoolError(format!("cohort address {} is not in the pool", address))
                })?;
            restored.push(entry.clone());
        }
        restored.sort_by_key(|a| a.activated_at);

        state.cohort = restored;
        state.last_rotation = last_rotation;
        Ok(())
    }

    /// Returns the current statistics.
    pub fn stats(&self) -> PoolStats {
        let state = self.state.read();
        PoolStats {
            total_addresses: state.addresses.len(),
            cohort_size: state.cohort.len(),
            newest_activation: state.addresses.last().map(|a| a.activated_at),
            last_rotation: state.last_rotation,
            rotations: state.rotations,
        }
    }

    /// Returns every address, ordered by activation (for export/backup).
    pub fn all_addresses(&self) -> Vec<PoolAddress> {
        self.state.read().addresses.clone()
    }

    /// When the cohort last rotated.
    pub fn last_rotation(&self) -> Option<Timestamp> {
        self.state.read().last_rotation
    }

    /// Returns the number of addresses.
    pub fn len(&self) -> usize {
        self.state.read().addresses.len()
    }

    /// Returns true if the pool holds no addresses.
    pub fn is_empty(&self) -> bool {
        self.state.read().addresses.is_empty()
    }

    /// Removes every address and the cohort.
    pub fn clear(&self) {
        *self.state.write() = PoolState::default();
    }
}

impl Default for MemoryAddressPool {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}

impl AddressPool for MemoryAddressPool {
    fn current_cohort(&self) -> Vec<PoolAddress> {
        self.state.read().cohort.clone()
    }

    fn activated_since(&self, since: Timestamp, until: Timestamp) -> Vec<PoolAddress> {
        if until <= since {
            return Vec::new();
        }
        let state = self.state.read();
        let start = state.activated_end(since);
        let end = state.activated_end(until);
        state.addresses[start..end].to_vec()
    }

    fn latest_activation(&self, until: Timestamp) -> Option<Timestamp> {
        let state = self.state.read();
        let end = state.activated_end(until);
        end.checked_sub(1).map(|i| state.addresses[i].activated_at)
    }
}

fn is_due(last_rotation: Option<Timestamp>, now: Timestamp, config: &PoolConfig) -> bool {
    match last_rotation {
        None => true,
        // A clock that went backwards is never due.
        Some(last) => match (now - last).to_std() {
            Ok(elapsed) => elapsed >= config.rotation_interval,
            Err(_) => false,
        },
    }
}

/// Addresses travel one per wire row, so anything that could split a row
/// is rejected.
fn validate_address(address: String) -> Result<String> {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        return Err(BritError::InvalidAddress("address cannot be empty".into()));
    }
    if trimmed.len() > MAX_ADDRESS_LEN {
        return Err(BritError::InvalidAddress(format!(
            "address longer than {} bytes",
            MAX_ADDRESS_LEN
        )));
    }
    if trimmed.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(BritError::InvalidAddress(
            "address cannot contain whitespace".into(),
        ));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use brit_core::types::timestamp_from_millis;
    use std::sync::Arc;
    use std::time::Duration;

    fn ts(millis: i64) -> Timestamp {
        timestamp_from_millis(millis).unwrap()
    }

    fn pool(cohort_size: usize) -> MemoryAddressPool {
        MemoryAddressPool::new(PoolConfig::default().with_cohort_size(cohort_size))
    }

    fn names(addresses: &[PoolAddress]) -> Vec<&str> {
        addresses.iter().map(|a| a.address.as_str()).collect()
    }

    #[test]
    fn test_activation_keeps_time_order() {
        let pool = pool(4);
        pool.activate("C", ts(300)).unwrap();
        pool.activate("A", ts(100)).unwrap();
        pool.activate("B", ts(200)).unwrap();

        assert_eq!(names(&pool.all_addresses()), vec!["A", "B", "C"]);
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn test_duplicate_rejected() {
        let pool = pool(4);
        pool.activate("A", ts(100)).unwrap();
        assert!(matches!(
            pool.activate("A", ts(200)),
            Err(BritError::InvalidAddress(_))
        ));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_invalid_addresses_rejected() {
        let pool = pool(4);
        let oversized = "x".repeat(MAX_ADDRESS_LEN + 1);
        for bad in ["", "   ", "1Addr\n1Bddr", "has space", oversized.as_str()] {
            assert!(
                matches!(pool.activate(bad, ts(1)), Err(BritError::InvalidAddress(_))),
                "accepted {:?}",
                bad
            );
        }
        assert!(pool.is_empty());
    }

    #[test]
    fn test_surrounding_whitespace_trimmed() {
        let pool = pool(4);
        pool.activate("  1Addr  ", ts(1)).unwrap();
        assert_eq!(pool.all_addresses()[0].address, "1Addr");
    }

    #[test]
    fn test_activation_does_not_touch_cohort() {
        let pool = pool(1);
        pool.activate("A", ts(100)).unwrap();
        assert!(pool.current_cohort().is_empty());

        pool.rotate_cohort(ts(100));
        pool.activate("B", ts(200)).unwrap();
        assert_eq!(names(&pool.current_cohort()), vec!["A"]);
    }

    #[test]
    fn test_rotation_picks_newest_activated() {
        let pool = pool(2);
        pool.activate("A", ts(100)).unwrap();
        pool.activate("B", ts(200)).unwrap();
        pool.activate("C", ts(300)).unwrap();
        pool.activate("D", ts(400)).unwrap();

        // D is not active yet at 350
        let cohort = pool.rotate_cohort(ts(350));
        assert_eq!(names(&cohort), vec!["B", "C"]);
        assert_eq!(pool.current_cohort(), cohort);
        assert_eq!(pool.last_rotation(), Some(ts(350)));
    }

    #[test]
    fn test_rotation_with_too_few_addresses() {
        let pool = pool(4);
        pool.activate("A", ts(100)).unwrap();
        assert_eq!(names(&pool.rotate_cohort(ts(100))), vec!["A"]);
        assert!(pool.rotate_cohort(ts(50)).is_empty());
    }

    #[test]
    fn test_rotate_if_due() {
        let pool = MemoryAddressPool::new(
            PoolConfig::default()
                .with_cohort_size(1)
                .with_rotation_interval(Duration::from_secs(10)),
        );
        pool.activate("A", ts(0)).unwrap();

        assert!(pool.is_rotation_due(ts(0)));
        assert!(pool.rotate_if_due(ts(0)));
        assert!(!pool.rotate_if_due(ts(9_999)));
        assert!(pool.rotate_if_due(ts(10_000)));
        // Clock moved backwards
        assert!(!pool.rotate_if_due(ts(5_000)));
        assert_eq!(pool.stats().rotations, 2);
    }

    #[test]
    fn test_activated_since_is_half_open() {
        let pool = pool(4);
        pool.activate("A", ts(100)).unwrap();
        pool.activate("B", ts(200)).unwrap();
        pool.activate("C", ts(300)).unwrap();

        assert_eq!(names(&pool.activated_since(ts(100), ts(300))), vec!["B", "C"]);
        assert_eq!(names(&pool.activated_since(ts(0), ts(200))), vec!["A", "B"]);
        assert!(pool.activated_since(ts(300), ts(1_000)).is_empty());
        assert!(pool.activated_since(ts(200), ts(100)).is_empty());
    }

    #[test]
    fn test_latest_activation() {
        let pool = pool(4);
        assert_eq!(pool.latest_activation(ts(1_000)), None);

        pool.activate("A", ts(100)).unwrap();
        pool.activate("B", ts(200)).unwrap();

        assert_eq!(pool.latest_activation(ts(50)), None);
        assert_eq!(pool.latest_activation(ts(100)), Some(ts(100)));
        assert_eq!(pool.latest_activation(ts(199)), Some(ts(100)));
        assert_eq!(pool.latest_activation(ts(1_000)), Some(ts(200)));
    }

    #[test]
    fn test_restore_cohort() {
        let pool = pool(4);
        pool.activate("A", ts(100)).unwrap();
        pool.activate("B", ts(200)).unwrap();

        pool.restore_cohort(&["B".to_string(), "A".to_string()], Some(ts(250)))
            .unwrap();
        assert_eq!(names(&pool.current_cohort()), vec!["A", "B"]);
        assert_eq!(pool.last_rotation(), Some(ts(250)));

        assert!(matches!(
            pool.restore_cohort(&["Z".to_string()], None),
            Err(BritError::PoolError(_))
        ));
    }

    #[test]
    fn test_stats_and_clear() {
        let pool = pool(1);
        pool.activate("A", ts(100)).unwrap();
        pool.activate("B", ts(200)).unwrap();
        pool.rotate_cohort(ts(200));

        let stats = pool.stats();
        assert_eq!(stats.total_addresses, 2);
        assert_eq!(stats.cohort_size, 1);
        assert_eq!(stats.newest_activation, Some(ts(200)));
        assert_eq!(stats.rotations, 1);

        pool.clear();
        assert!(pool.is_empty());
        assert_eq!(pool.stats(), PoolStats::default());
    }

    #[test]
    fn test_import() {
        let pool = pool(4);
        let imported = pool
            .import(vec![PoolAddress::new("A", ts(1)), PoolAddress::new("B", ts(2))])
            .unwrap();
        assert_eq!(imported, 2);
        assert!(pool.import(vec![PoolAddress::new("A", ts(3))]).is_err());
    }

    #[test]
    fn test_readers_never_observe_partial_cohort() {
        let pool = Arc::new(pool(3));
        for i in 0..30 {
            pool.activate(format!("addr{:02}", i), ts(i)).unwrap();
        }
        pool.rotate_cohort(ts(2));

        let writer = {
            let pool = pool.clone();
            std::thread::spawn(move || {
                for now in 3..30 {
                    pool.rotate_cohort(ts(now));
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let pool = pool.clone();
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        let cohort = pool.current_cohort();
                        assert_eq!(cohort.len(), 3);
                        // A whole cohort is three consecutive activations.
                        let first = cohort[0].activated_at.timestamp_millis();
                        for (offset, entry) in cohort.iter().enumerate() {
                            assert_eq!(entry.activated_at.timestamp_millis(), first + offset as i64);
                        }
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
    }
}
