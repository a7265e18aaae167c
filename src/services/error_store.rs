//! Captured-error persistence.
//!
//! # Responsibilities
//! - Keep captured errors in insertion order
//! - Persist across restarts via a JSON file
//! - Support individual dismissal by index and bulk clearing
//!
//! # Design Decisions
//! - Every mutation writes through to disk when a path is configured, so a
//!   crash never loses an already-captured error
//! - Index-based dismissal matches the order `all()` returns

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors from the store itself.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("no stored error at index {0}")]
    IndexOutOfRange(usize),

    #[error("store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One captured application error, persisted for later reporting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredError {
    pub id: Uuid,
    /// Seconds since epoch at capture time.
    pub timestamp: u64,
    pub message: String,
    /// Free-form metadata attached at capture time (stack, route, versions).
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl StoredError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: unix_now(),
            message: message.into(),
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Ordered, optionally file-backed store of captured errors.
pub struct ErrorStore {
    inner: RwLock<Vec<StoredError>>,
    persistence_path: Option<PathBuf>,
}

impl ErrorStore {
    /// Volatile store, used in tests and when no path is configured.
    pub fn in_memory() -> Self {
        Self {
            inner: RwLock::new(Vec::new()),
            persistence_path: None,
        }
    }

    /// Open a file-backed store, loading any previously saved errors.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let mut errors = Vec::new();
        if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            errors = serde_json::from_reader(reader)?;
            tracing::info!(
                count = errors.len(),
                path = %path.display(),
                "loaded stored errors"
            );
        }
        Ok(Self {
            inner: RwLock::new(errors),
            persistence_path: Some(path),
        })
    }

    /// Append one captured error.
    pub fn save(&self, error: StoredError) -> StoreResult<()> {
        let mut guard = self.write()?;
        guard.push(error);
        self.persist(&guard)
    }

    pub fn has_errors(&self) -> StoreResult<bool> {
        Ok(!self.read()?.is_empty())
    }

    /// All stored errors, oldest first.
    pub fn all(&self) -> StoreResult<Vec<StoredError>> {
        Ok(self.read()?.clone())
    }

    pub fn clear(&self) -> StoreResult<()> {
        let mut guard = self.write()?;
        guard.clear();
        self.persist(&guard)
    }

    /// Remove the error at `index` (0-based, in `all()` order), keeping the
    /// relative order of the remaining records.
    pub fn dismiss(&self, index: usize) -> StoreResult<()> {
        let mut guard = self.write()?;
        if index >= guard.len() {
            return Err(StoreError::IndexOutOfRange(index));
        }
        guard.remove(index);
        self.persist(&guard)
    }

    fn persist(&self, errors: &[StoredError]) -> StoreResult<()> {
        if let Some(path) = &self.persistence_path {
            let writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer(writer, errors)?;
        }
        Ok(())
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Vec<StoredError>>> {
        self.inner.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Vec<StoredError>>> {
        self.inner.write().map_err(|_| StoreError::Poisoned)
    }
}
