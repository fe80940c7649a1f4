//! Last-known check outcomes, cached in memory and mirrored to a TOML file.
//!
//! The store is shared between a one-shot `check` invocation and any
//! long-running viewer of the same file without a coordinating daemon:
//! every read path compares the backing file's modification time against
//! the last one seen and reloads the whole map when the file is newer.
//! Cross-process writes are last-writer-wins.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// The durable record of one check's most recent outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastState {
    /// Check name at the time of the run.
    pub name: String,

    /// Stable check identity; the store key.
    pub uuid: String,

    /// Whether the check passed.
    pub state: bool,

    /// Human-readable status captured from the run.
    pub details: String,
}

/// Errors from state persistence.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// Writing the backing file failed.
    ///
    /// The overwrite is atomic in intent only: a failure part-way through
    /// leaves whatever the underlying write left behind.
    #[error("failed to write state file {path}: {source}")]
    Write {
        /// Backing file path.
        path: PathBuf,
        /// Underlying write failure.
        #[source]
        source: std::io::Error,
    },

    /// Serializing the state map failed.
    #[error("failed to serialize state: {0}")]
    Serialize(#[from] toml::ser::Error),
}

struct Inner {
    states: BTreeMap<String, LastState>,
    /// Backing-file mtime as of the last load or commit. `None` until the
    /// file has been seen once, which forces the first read to load it.
    last_modified: Option<SystemTime>,
}

/// Process-wide cache of the last known result per check UUID, backed by a
/// single TOML file.
///
/// All mutations and reads go through one read/write lock. Readers may run
/// concurrently; any reload or write excludes them.
pub struct StateStore {
    path: PathBuf,
    inner: RwLock<Inner>,
}

impl StateStore {
    /// Open a store over `path`. The file is not read until first use and
    /// does not need to exist.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            inner: RwLock::new(Inner {
                states: BTreeMap::new(),
                last_modified: None,
            }),
        }
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert or overwrite the record for `state.uuid` in memory.
    ///
    /// Not durable until [`StateStore::commit`] runs. Stale on-disk content
    /// is merged in first, so a filtered run updating only some checks
    /// leaves every other entry untouched.
    pub fn update(&self, state: LastState) {
        let mut inner = self.write_fresh();
        inner.states.insert(state.uuid.clone(), state);
    }

    /// Serialize the entire map to the backing file.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] when serialization or the file write fails;
    /// the in-memory map is unaffected either way.
    pub fn commit(&self) -> Result<(), StateError> {
        let mut inner = self.write_fresh();
        let serialized = toml::to_string_pretty(&inner.states)?;
        std::fs::write(&self.path, serialized).map_err(|source| StateError::Write {
            path: self.path.clone(),
            source,
        })?;
        inner.last_modified = disk_mtime(&self.path);
        debug!(path = %self.path.display(), entries = inner.states.len(), "state committed");
        Ok(())
    }

    /// Last known record for `uuid`, if any.
    pub fn get(&self, uuid: &str) -> Option<LastState> {
        self.read_fresh().states.get(uuid).cloned()
    }

    /// Snapshot of all records, keyed by UUID.
    pub fn all(&self) -> BTreeMap<String, LastState> {
        self.read_fresh().states.clone()
    }

    /// Whether every stored record passed. An empty store is vacuously
    /// all-passed. Entries from earlier runs count like fresh ones.
    pub fn all_passed(&self) -> bool {
        self.read_fresh().states.values().all(|s| s.state)
    }

    /// All failing records.
    pub fn failed(&self) -> Vec<LastState> {
        self.read_fresh()
            .states
            .values()
            .filter(|s| !s.state)
            .cloned()
            .collect()
    }

    /// Backing-file mtime as of the last load or commit.
    pub fn last_modified(&self) -> Option<SystemTime> {
        self.read_fresh().last_modified
    }

    /// Take the read lock, reloading from disk first when the backing file
    /// is newer than what memory has seen.
    fn read_fresh(&self) -> RwLockReadGuard<'_, Inner> {
        let disk = disk_mtime(&self.path);
        {
            let inner = self.read_lock();
            if !is_stale(disk, inner.last_modified) {
                return inner;
            }
        }

        drop(self.write_fresh());
        self.read_lock()
    }

    /// Take the write lock, reloading from disk first when the backing
    /// file is newer than what memory has seen.
    fn write_fresh(&self) -> RwLockWriteGuard<'_, Inner> {
        let disk = disk_mtime(&self.path);
        let mut inner = self.write_lock();
        if is_stale(disk, inner.last_modified) {
            self.reload(&mut inner, disk);
        }
        inner
    }

    /// Replace the in-memory map with the backing file's content.
    ///
    /// A missing or undecodable file keeps the current map; the next read
    /// will try again.
    fn reload(&self, inner: &mut Inner, disk: Option<SystemTime>) {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "state file not readable");
                return;
            }
        };
        match toml::from_str::<BTreeMap<String, LastState>>(&raw) {
            Ok(states) => {
                inner.states = states;
                inner.last_modified = disk;
                debug!(path = %self.path.display(), entries = inner.states.len(), "state reloaded");
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "state file is not valid TOML, keeping cached states");
            }
        }
    }

    fn read_lock(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_lock(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn disk_mtime(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn is_stale(disk: Option<SystemTime>, seen: Option<SystemTime>) -> bool {
    match disk {
        Some(disk) => seen.map_or(true, |seen| disk > seen),
        // No file on disk: memory is authoritative.
        None => false,
    }
}
