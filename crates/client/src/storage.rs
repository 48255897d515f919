//! Session-scoped key/value persistence for the client store.
//!
//! Values are JSON strings under fixed keys ([`USER_KEY`], [`CART_KEY`]).
//! A session lasts as long as the backing storage: the process for
//! [`MemoryStorage`], the session directory for [`FileStorage`].

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use thiserror::Error;
use tracing::warn;

/// Key holding the serialized [`User`](dwa_core::User).
pub const USER_KEY: &str = "user";

/// Key holding the serialized [`Cart`](dwa_core::Cart).
pub const CART_KEY: &str = "cart";

const SESSION_FILE: &str = "session.json";

/// Errors from a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Session file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize session value: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// String key/value storage scoped to one session.
pub trait SessionStorage: Send + Sync {
    /// Read `key`, `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write `value` under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Remove every key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    fn clear(&self) -> Result<(), StorageError>;
}

// =============================================================================
// MemoryStorage
// =============================================================================

/// In-process storage. Dropped with the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries().remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.entries().clear();
        Ok(())
    }
}

// =============================================================================
// FileStorage
// =============================================================================

/// Storage backed by one JSON document in a session directory.
///
/// Every write rewrites the document through a temporary file and a rename,
/// so a crash mid-write leaves the previous session intact.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    /// Storage at `<dir>/session.json`. The directory is created on first
    /// write.
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(SESSION_FILE),
            lock: Mutex::new(()),
        }
    }

    /// Path of the session document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(StorageError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        serde_json::from_str(&raw).map_err(|source| StorageError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn store(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(io_err)?;
        }
        let body = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)
    }

    /// Apply `f` to the stored entries and write them back. A corrupt
    /// document is replaced rather than blocking every later write.
    fn modify(&self, f: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = match self.load() {
            Ok(entries) => entries,
            Err(e @ StorageError::Corrupt { .. }) => {
                warn!(error = %e, "Replacing corrupt session file");
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        f(&mut entries);
        self.store(&entries)
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.modify(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.modify(|entries| {
            entries.remove(key);
        })
    }

    fn clear(&self) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn exercise(storage: &dyn SessionStorage) {
        assert_eq!(storage.get(USER_KEY).unwrap(), None);
        storage.set(USER_KEY, r#"{"name":"Ama"}"#).unwrap();
        storage.set(CART_KEY, "[]").unwrap();
        assert_eq!(storage.get(USER_KEY).unwrap().as_deref(), Some(r#"{"name":"Ama"}"#));

        storage.remove(USER_KEY).unwrap();
        storage.remove(USER_KEY).unwrap();
        assert_eq!(storage.get(USER_KEY).unwrap(), None);
        assert_eq!(storage.get(CART_KEY).unwrap().as_deref(), Some("[]"));

        storage.clear().unwrap();
        assert_eq!(storage.get(CART_KEY).unwrap(), None);
    }

    #[test]
    fn test_memory_storage() {
        exercise(&MemoryStorage::new());
    }

    #[test]
    fn test_file_storage() {
        let dir = tempfile::tempdir().unwrap();
        exercise(&FileStorage::new(dir.path().join("nested")));
    }

    #[test]
    fn test_file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        FileStorage::new(dir.path()).set(CART_KEY, "[1]").unwrap();
        let reopened = FileStorage::new(dir.path());
        assert_eq!(reopened.get(CART_KEY).unwrap().as_deref(), Some("[1]"));
    }

    #[test]
    fn test_file_storage_reports_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        fs::write(storage.path(), "not json").unwrap();
        assert!(matches!(
            storage.get(USER_KEY),
            Err(StorageError::Corrupt { .. })
        ));
        storage.clear().unwrap();
        assert_eq!(storage.get(USER_KEY).unwrap(), None);
    }

    #[test]
    fn test_writes_replace_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());

        fs::write(storage.path(), "not json").unwrap();
        storage.remove(USER_KEY).unwrap();
        assert_eq!(storage.get(USER_KEY).unwrap(), None);

        fs::write(storage.path(), "{\"user\": ").unwrap();
        storage.set(CART_KEY, "[]").unwrap();
        assert_eq!(storage.get(CART_KEY).unwrap().as_deref(), Some("[]"));
    }
}
