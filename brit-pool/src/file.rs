//! File-backed address pool with persistence.
//!
//! Keeps a [`MemoryAddressPool`] in memory and writes JSON snapshots to
//! disk, so a restarted Matcher keeps its addresses, activation times and
//! current cohort.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use brit_core::error::{BritError, Result};
use brit_core::traits::AddressPool;
use brit_core::types::{timestamp_from_millis, PoolAddress, Timestamp};

use crate::config::PoolConfig;
use crate::memory::{MemoryAddressPool, PoolStats};

/// Current snapshot format version
const SNAPSHOT_VERSION: u8 = 1;

/// On-disk form of a pool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    /// Snapshot format version
    pub version: u8,
    /// Every address with its activation time
    pub addresses: Vec<PoolAddress>,
    /// Addresses of the current cohort
    pub cohort: Vec<String>,
    /// When the cohort last rotated
    pub last_rotation: Option<Timestamp>,
}

/// File-backed address pool.
///
/// Mutations mark the pool dirty; call [`save`](Self::save) or
/// [`flush`](Self::flush) to persist. Saves are serialized and each writes a
/// uniquely named temp file in the snapshot's directory before renaming it
/// over the snapshot.
pub struct FileAddressPool {
    path: PathBuf,
    memory: MemoryAddressPool,
    dirty: AtomicBool,
    save_lock: Mutex<()>,
}

impl FileAddressPool {
    /// Opens the pool at `path`, loading the snapshot if the file exists.
    pub async fn open(path: impl AsRef<Path>, config: PoolConfig) -> Result<Self> {
        let pool = Self {
            path: path.as_ref().to_path_buf(),
            memory: MemoryAddressPool::new(config),
            dirty: AtomicBool::new(false),
            save_lock: Mutex::new(()),
        };

        if fs::try_exists(&pool.path).await? {
            pool.load().await?;
        }

        Ok(pool)
    }

    #[instrument(skip(self))]
    async fn load(&self) -> Result<()> {
        let contents = fs::read(&self.path).await?;
        let snapshot: PoolSnapshot = serde_json::from_slice(&contents)?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(BritError::PoolError(format!(
                "unsupported pool snapshot version {}",
                snapshot.version
            )));
        }

        info!(count = snapshot.addresses.len(), "Loading pool from file");
        self.memory.import(snapshot.addresses)?;
        self.memory
            .restore_cohort(&snapshot.cohort, snapshot.last_rotation)?;

        self.dirty.store(false, Ordering::SeqCst);
        debug!("Pool loaded successfully");
        Ok(())
    }

    /// Captures the current state.
    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            version: SNAPSHOT_VERSION,
            addresses: self.memory.all_addresses(),
            cohort: self
                .memory
                .current_cohort()
                .into_iter()
                .map(|a| a.address)
                .collect(),
            last_rotation: self.memory.last_rotation(),
        }
    }

    /// Writes the pool to disk.
    pub async fn save(&self) -> Result<()> {
        let _guard = self.save_lock.lock().await;
        self.dirty.swap(false, Ordering::SeqCst);
        self.write_snapshot().await
    }

    /// Saves if there are unsaved changes.
    pub async fn flush(&self) -> Result<()> {
        let _guard = self.save_lock.lock().await;
        if !self.dirty.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        self.write_snapshot().await
    }

    /// Caller holds `save_lock` and has already cleared the dirty flag, so
    /// a mutation racing the snapshot marks the pool dirty again.
    #[instrument(skip(self))]
    async fn write_snapshot(&self) -> Result<()> {
        let result = self.write_snapshot_inner().await;
        if result.is_err() {
            self.dirty.store(true, Ordering::SeqCst);
        }
        result
    }

    async fn write_snapshot_inner(&self) -> Result<()> {
        let snapshot = self.snapshot();
        info!(count = snapshot.addresses.len(), path = ?self.path, "Saving pool to file");

        let serialized = serde_json::to_vec_pretty(&snapshot)?;
        let path = self.path.clone();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut temp = NamedTempFile::new_in(&dir)?;
            temp.write_all(&serialized)?;
            temp.as_file().sync_all()?;
            temp.persist(&path).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| BritError::InternalError(format!("pool save task failed: {}", e)))??;

        debug!("Pool saved successfully");
        Ok(())
    }

    /// Checks if there are unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// See [`MemoryAddressPool::activate`].
    pub fn activate(&self, address: impl Into<String>, at: Timestamp) -> Result<()> {
        self.memory.activate(address, at)?;
        self.dirty.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// See [`MemoryAddressPool::rotate_cohort`].
    pub fn rotate_cohort(&self, now: Timestamp) -> Vec<PoolAddress> {
        let cohort = self.memory.rotate_cohort(now);
        self.dirty.store(true, Ordering::SeqCst);
        cohort
    }

    /// See [`MemoryAddressPool::rotate_if_due`].
    pub fn rotate_if_due(&self, now: Timestamp) -> bool {
        let rotated = self.memory.rotate_if_due(now);
        if rotated {
            self.dirty.store(true, Ordering::SeqCst);
        }
        rotated
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the underlying memory pool for direct access.
    pub fn memory(&self) -> &MemoryAddressPool {
        &self.memory
    }

    /// Returns statistics.
    pub fn stats(&self) -> PoolStats {
        self.memory.stats()
    }

    /// Returns the number of addresses.
    pub fn len(&self) -> usize {
        self.memory.len()
    }

    /// Returns true if empty.
    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }
}

impl Drop for FileAddressPool {
    fn drop(&mut self) {
        if self.is_dirty() {
            warn!(path = ?self.path, "FileAddressPool dropped with unsaved changes");
        }
    }
}

impl AddressPool for FileAddressPool {
    fn current_cohort(&self) -> Vec<PoolAddress> {
        self.memory.current_cohort()
    }

    fn activated_since(&self, since: Timestamp, until: Timestamp) -> Vec<PoolAddress> {
        self.memory.activated_since(since, until)
    }

    fn latest_activation(&self, until: Timestamp) -> Option<Timestamp> {
        self.memory.latest_activation(until)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ADDRESS LIST FILES
// ═══════════════════════════════════════════════════════════════════════════════

/// Parses a plain-text address list.
///
/// One address per line, optionally followed by its activation time in
/// epoch millis. Lines without a time activate at `default_activation`.
/// Blank lines and `#` comments are ignored.
///
/// ```text
/// # seeded 2014-05-13
/// 1AGNa15ZQXAZUgFiqJ2i7Z2DPU2J6hW62i 1400000000000
/// 1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2
/// ```
pub fn parse_address_list(text: &str, default_activation: Timestamp) -> Result<Vec<PoolAddress>> {
    let mut addresses = Vec::new();

    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut fields = line.split_whitespace();
        let (Some(address), activation, None) = (fields.next(), fields.next(), fields.next()) else {
            return Err(BritError::PoolError(format!(
                "line {}: expected '<address> [activation-millis]'",
                number + 1
            )));
        };

        let activated_at = match activation {
            None => default_activation,
            Some(millis) => {
                let millis = millis.parse::<i64>().map_err(|_| {
                    BritError::PoolError(format!("line {}: invalid activation time", number + 1))
                })?;
                timestamp_from_millis(millis)?
            }
        };

        addresses.push(PoolAddress::new(address, activated_at));
    }

    Ok(addresses)
}

/// Reads and parses an address list file (see [`parse_address_list`]).
pub async fn load_address_list(
    path: impl AsRef<Path>,
    default_activation: Timestamp,
) -> Result<Vec<PoolAddress>> {
    let text = fs::read_to_string(path.as_ref()).await?;
    parse_address_list(&text, default_activation)
}
