//! Replay-date persistence.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, instrument};

use brit_core::error::Result;
use brit_core::traits::ReplayDateStore;
use brit_core::types::Timestamp;

/// Replay date held in memory only.
#[derive(Debug, Default)]
pub struct MemoryReplayStore {
    replay_date: RwLock<Option<Timestamp>>,
}

impl MemoryReplayStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `replay_date`.
    pub fn with_replay_date(replay_date: Option<Timestamp>) -> Self {
        Self {
            replay_date: RwLock::new(replay_date),
        }
    }
}

#[async_trait]
impl ReplayDateStore for MemoryReplayStore {
    async fn load(&self) -> Result<Option<Timestamp>> {
        Ok(*self.replay_date.read())
    }

    async fn save(&self, replay_date: Option<Timestamp>) -> Result<()> {
        *self.replay_date.write() = replay_date;
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct ReplayDateFile {
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    replay_date: Option<Timestamp>,
}

/// Replay date kept in a small JSON file.
///
/// ```json
/// { "replay_date": 1400000000000 }
/// ```
///
/// A missing file reads as "no replay date".
#[derive(Clone, Debug)]
pub struct FileReplayStore {
    path: PathBuf,
}

impl FileReplayStore {
    /// Creates a store backed by `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ReplayDateStore for FileReplayStore {
    #[instrument(skip(self), fields(path = ?self.path))]
    async fn load(&self) -> Result<Option<Timestamp>> {
        if !fs::try_exists(&self.path).await? {
            return Ok(None);
        }
        let contents = fs::read(&self.path).await?;
        let file: ReplayDateFile = serde_json::from_slice(&contents)?;
        debug!(has_replay_date = file.replay_date.is_some(), "Loaded replay date");
        Ok(file.replay_date)
    }

    #[instrument(skip(self), fields(path = ?self.path))]
    async fn save(&self, replay_date: Option<Timestamp>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let serialized = serde_json::to_vec(&ReplayDateFile { replay_date })?;
        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, &serialized).await?;
        fs::rename(&temp_path, &self.path).await?;

        debug!("Saved replay date");
        Ok(())
    }
}
