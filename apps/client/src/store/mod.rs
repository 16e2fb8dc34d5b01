//! Persistent store adapter — a file-backed key→JSON-document store.
//!
//! Each key maps to one JSON file under the profile's data directory.
//! Reads and writes are synchronous; collection writes enforce a per-key
//! byte budget with a truncate-then-clear recovery pass, so a full store
//! degrades instead of failing the caller.

pub mod keys;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// How many entries a collection keeps when a write exceeds the byte budget.
pub const QUOTA_KEEP_RECENT: usize = 50;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// What actually happened during a collection write.
///
/// `Truncated` and `Cleared` are degraded-but-successful outcomes: the caller's
/// operation went through, but older records were shed to stay inside the
/// byte budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The full collection was persisted.
    Full,
    /// Only the most recent entries were persisted.
    Truncated,
    /// The key was removed entirely; a subsequent read returns the default.
    Cleared,
}

/// Records that carry a creation timestamp, so quota recovery can keep the
/// most recent entries.
pub trait Timestamped {
    fn created_at(&self) -> DateTime<Utc>;
}

/// File-backed key-value store. Cheap to clone; clones share the same
/// directory and budget.
#[derive(Debug, Clone)]
pub struct StoreAdapter {
    root: PathBuf,
    byte_budget: usize,
}

impl StoreAdapter {
    /// Opens (and creates, if needed) the store directory.
    pub fn open(root: impl AsRef<Path>, byte_budget: usize) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root, byte_budget })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }

    /// Reads and parses the value stored under `key`. A missing file or a
    /// corrupt document both yield `default`; corruption is logged and
    /// treated as absence, never surfaced.
    pub fn read_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let path = self.path_for(key);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(_) => return default,
        };
        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!("Discarding corrupt store document '{key}': {e}");
                default
            }
        }
    }

    /// Reads the value stored under `key`, if present and parseable.
    pub fn read_opt<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = fs::read_to_string(self.path_for(key)).ok()?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Discarding corrupt store document '{key}': {e}");
                None
            }
        }
    }

    /// Persists a scalar value (token, profile snapshot, pairing flag).
    /// Scalars are small; the collection byte budget does not apply.
    pub fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_vec(value)?;
        fs::write(self.path_for(key), json)?;
        debug!("Wrote store key '{key}'");
        Ok(())
    }

    /// Persists a collection, enforcing the byte budget.
    ///
    /// Over budget, one recovery pass keeps the `QUOTA_KEEP_RECENT` most
    /// recent entries (by creation timestamp, descending) and retries; if the
    /// truncated form is still too large the key is cleared. Data loss on the
    /// recovery path is accepted — the outcome tells the caller which case
    /// occurred.
    pub fn write_collection<T>(&self, key: &str, items: &[T]) -> Result<WriteOutcome, StoreError>
    where
        T: Serialize + Timestamped + Clone,
    {
        let json = serde_json::to_vec(items)?;
        if json.len() <= self.byte_budget {
            fs::write(self.path_for(key), json)?;
            return Ok(WriteOutcome::Full);
        }

        warn!(
            "Store key '{key}' exceeds byte budget ({} > {}); keeping {} most recent entries",
            json.len(),
            self.byte_budget,
            QUOTA_KEEP_RECENT
        );

        let mut kept: Vec<T> = items.to_vec();
        kept.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        kept.truncate(QUOTA_KEEP_RECENT);

        let json = serde_json::to_vec(&kept)?;
        if json.len() <= self.byte_budget {
            fs::write(self.path_for(key), json)?;
            return Ok(WriteOutcome::Truncated);
        }

        warn!("Store key '{key}' still over budget after truncation; clearing it");
        self.remove(key)?;
        Ok(WriteOutcome::Cleared)
    }

    /// Removes the value stored under `key`. Removing an absent key is not an
    /// error.
    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}
