//! Geometry cache transport
//!
//! Entry sets are written whole and replaced whole; a store never merges a
//! partial update into an existing set. Failures surface as [`CacheError`],
//! which the bake treats as a miss (reads) or a no-op (writes).

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use futures::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::key::CacheKey;
use super::BakeReason;
use crate::model::{CacheEntry, CacheError};

/// Persistent key-value transport for baked entry sets.
pub trait GeometryStore {
    /// Fetch the entry set for a key; `Ok(None)` on a miss.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` when the transport fails or the stored set is unreadable.
    fn get<'a>(
        &'a self,
        key: &'a CacheKey,
    ) -> LocalBoxFuture<'a, Result<Option<Vec<CacheEntry>>, CacheError>>;

    /// Replace the entry set for a key.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` when the set could not be written.
    fn set<'a>(
        &'a self,
        key: &'a CacheKey,
        entries: Vec<CacheEntry>,
        reason: BakeReason,
    ) -> LocalBoxFuture<'a, Result<(), CacheError>>;
}

/// In-memory store, shared between views through `Rc`.
#[derive(Debug, Default)]
pub struct MemoryGeometryStore {
    sets: RefCell<HashMap<CacheKey, Vec<CacheEntry>>>,
    reads: Cell<usize>,
    writes: Cell<usize>,
    reasons: RefCell<Vec<BakeReason>>,
    fail_reads: Cell<bool>,
    fail_writes: Cell<bool>,
}

impl MemoryGeometryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `get` calls so far.
    pub fn reads(&self) -> usize {
        self.reads.get()
    }

    /// Number of successful `set` calls so far.
    pub fn writes(&self) -> usize {
        self.writes.get()
    }

    /// Reasons of the successful `set` calls, oldest first.
    pub fn write_reasons(&self) -> Vec<BakeReason> {
        self.reasons.borrow().clone()
    }

    /// Stored set for a key.
    pub fn entries(&self, key: &CacheKey) -> Option<Vec<CacheEntry>> {
        self.sets.borrow().get(key).cloned()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.sets.borrow().len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.sets.borrow().is_empty()
    }

    /// Make subsequent reads fail.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.set(fail);
    }

    /// Make subsequent writes fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }
}

impl GeometryStore for MemoryGeometryStore {
    fn get<'a>(
        &'a self,
        key: &'a CacheKey,
    ) -> LocalBoxFuture<'a, Result<Option<Vec<CacheEntry>>, CacheError>> {
        Box::pin(async move {
            self.reads.set(self.reads.get() + 1);
            if self.fail_reads.get() {
                return Err(CacheError::Unavailable("reads disabled".to_string()));
            }
            Ok(self.sets.borrow().get(key).cloned())
        })
    }

    fn set<'a>(
        &'a self,
        key: &'a CacheKey,
        entries: Vec<CacheEntry>,
        reason: BakeReason,
    ) -> LocalBoxFuture<'a, Result<(), CacheError>> {
        Box::pin(async move {
            if self.fail_writes.get() {
                return Err(CacheError::Unavailable("writes disabled".to_string()));
            }
            debug!(%key, %reason, entries = entries.len(), "Storing geometry in memory");
            self.sets.borrow_mut().insert(key.clone(), entries);
            self.writes.set(self.writes.get() + 1);
            self.reasons.borrow_mut().push(reason);
            Ok(())
        })
    }
}

/// On-disk representation of one entry set.
#[derive(Debug, Serialize, Deserialize)]
struct StoredSet {
    reason: String,
    entries: Vec<CacheEntry>,
}

/// One JSON file per key under a cache directory.
///
/// Writes go to a temporary sibling and are renamed into place, so readers
/// never observe a half-written set.
#[derive(Debug, Clone)]
pub struct JsonFileGeometryStore {
    dir: PathBuf,
}

impl JsonFileGeometryStore {
    /// Store rooted at `dir`; the directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding the set for a key.
    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.as_str()))
    }

    fn io_error(path: &Path, source: io::Error) -> CacheError {
        CacheError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl GeometryStore for JsonFileGeometryStore {
    fn get<'a>(
        &'a self,
        key: &'a CacheKey,
    ) -> LocalBoxFuture<'a, Result<Option<Vec<CacheEntry>>, CacheError>> {
        Box::pin(async move {
            let path = self.path_for(key);
            let bytes = match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
                Err(e) => return Err(Self::io_error(&path, e)),
            };
            let stored: StoredSet =
                serde_json::from_slice(&bytes).map_err(|e| CacheError::Malformed {
                    key: key.to_string(),
                    reason: e.to_string(),
                })?;
            Ok(Some(stored.entries))
        })
    }

    fn set<'a>(
        &'a self,
        key: &'a CacheKey,
        entries: Vec<CacheEntry>,
        reason: BakeReason,
    ) -> LocalBoxFuture<'a, Result<(), CacheError>> {
        Box::pin(async move {
            tokio::fs::create_dir_all(&self.dir)
                .await
                .map_err(|e| Self::io_error(&self.dir, e))?;

            let stored = StoredSet {
                reason: reason.to_string(),
                entries,
            };
            let json = serde_json::to_vec(&stored).map_err(|e| CacheError::Malformed {
                key: key.to_string(),
                reason: e.to_string(),
            })?;

            let path = self.path_for(key);
            let tmp = path.with_extension("json.tmp");
            tokio::fs::write(&tmp, &json)
                .await
                .map_err(|e| Self::io_error(&tmp, e))?;
            if let Err(e) = tokio::fs::rename(&tmp, &path).await {
                let _ = tokio::fs::remove_file(&tmp).await;
                return Err(Self::io_error(&path, e));
            }
            debug!(path = %path.display(), entries = stored.entries.len(), "Stored geometry");
            Ok(())
        })
    }
}
