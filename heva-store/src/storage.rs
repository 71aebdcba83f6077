//! String key/value storage.
//!
//! [`Storage`] is the persistence seam for everything client-local: the
//! auth token and the response cache share one namespace, just as they
//! would in a browser's local storage.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use tracing::{debug, warn};

use crate::error::StoreError;
use crate::persistence::{default_storage_path, load_json, save_json};

// ============================================================================
// Storage Trait
// ============================================================================

/// Synchronous string key/value store.
pub trait Storage: Send + Sync {
    /// Returns the value stored under `key`.
    fn get_item(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removes `key`. Removing a missing key is not an error.
    fn remove_item(&self, key: &str) -> Result<(), StoreError>;

    /// Lists all keys.
    fn keys(&self) -> Vec<String>;

    /// Removes every key for which `predicate` returns true.
    fn remove_where(&self, predicate: &dyn Fn(&str) -> bool) -> Result<usize, StoreError> {
        let doomed: Vec<String> = self.keys().into_iter().filter(|k| predicate(k.as_str())).collect();
        for key in &doomed {
            self.remove_item(key)?;
        }
        Ok(doomed.len())
    }
}

// ============================================================================
// Memory Storage
// ============================================================================

/// In-process storage. Contents are lost on drop.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RwLock<BTreeMap<String, String>>,
}

impl MemoryStorage {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.items.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.items
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        self.items
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}

// ============================================================================
// File Storage
// ============================================================================

/// Storage persisted as a single JSON object on disk.
///
/// The file is read once on open; every mutation rewrites it atomically.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    items: RwLock<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Opens the storage file at `path`.
    ///
    /// A missing file starts empty. A corrupt file is logged and treated as
    /// empty; it is replaced on the next write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let items = if path.exists() {
            match load_json::<BTreeMap<String, String>>(&path) {
                Ok(items) => {
                    debug!(path = %path.display(), keys = items.len(), "Loaded storage");
                    items
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Unreadable storage file, starting empty");
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };

        Self {
            path,
            items: RwLock::new(items),
        }
    }

    /// Opens the storage file at the default location.
    pub fn open_default() -> Self {
        Self::open(default_storage_path())
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Applies `f` and persists the result.
    ///
    /// The in-memory map only changes once the file write succeeds, so a
    /// failed save leaves memory and disk in agreement.
    fn mutate<F>(&self, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = items.clone();
        f(&mut next);
        save_json(&self.path, &next)?;
        *items = next;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.mutate(|items| {
            items.insert(key.to_string(), value.to_string());
        })
    }

    fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        if self.get_item(key).is_none() {
            return Ok(());
        }
        self.mutate(|items| {
            items.remove(key);
        })
    }

    fn keys(&self) -> Vec<String> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    fn remove_where(&self, predicate: &dyn Fn(&str) -> bool) -> Result<usize, StoreError> {
        let mut removed = 0;
        self.mutate(|items| {
            let before = items.len();
            items.retain(|k, _| !predicate(k.as_str()));
            removed = before - items.len();
        })?;
        Ok(removed)
    }
}
