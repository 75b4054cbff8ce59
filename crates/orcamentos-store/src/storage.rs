//! The document storage capability.
//!
//! A document is a whole JSON string stored under a key. Every record
//! collection lives in one document, so storage backends only need three
//! whole-value operations.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::error::{Result, StoreError};

pub trait DocumentStorage {
    /// Read the document stored under `key`, if any.
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Replace the document stored under `key`.
    fn write(&self, key: &str, value: &str) -> Result<()>;

    /// Remove the document stored under `key`. Removing a missing key is not
    /// an error.
    fn remove(&self, key: &str) -> Result<()>;
}

impl<T: DocumentStorage + ?Sized> DocumentStorage for &T {
    fn read(&self, key: &str) -> Result<Option<String>> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        (**self).write(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

/// In-process document storage.
///
/// Used for ephemeral sessions and as a test double: the storage can be
/// switched off entirely, given a byte quota to simulate a full disk, or have
/// single documents made read-only.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    documents: Mutex<HashMap<String, String>>,
    unavailable: AtomicBool,
    quota: Mutex<Option<usize>>,
    read_only: Mutex<HashSet<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Limit the total size of all stored documents, in bytes.
    pub fn set_quota(&self, quota: Option<usize>) -> Result<()> {
        *self.quota.lock().map_err(|_| poisoned())? = quota;
        Ok(())
    }

    /// Make writes and removals of `key` fail while reads keep working.
    pub fn set_read_only(&self, key: &str, read_only: bool) -> Result<()> {
        let mut keys = self.read_only.lock().map_err(|_| poisoned())?;
        if read_only {
            keys.insert(key.to_string());
        } else {
            keys.remove(key);
        }
        Ok(())
    }

    /// Store a raw document, bypassing the quota. Lets tests plant
    /// corrupted data.
    pub fn insert_raw(&self, key: &str, value: &str) -> Result<()> {
        self.documents
            .lock()
            .map_err(|_| poisoned())?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.documents
            .lock()
            .map(|docs| docs.contains_key(key))
            .unwrap_or(false)
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("armazenamento desativado".into()));
        }
        Ok(())
    }

    fn check_writable(&self, key: &str) -> Result<()> {
        self.check_available()?;
        if self.read_only.lock().map_err(|_| poisoned())?.contains(key) {
            return Err(StoreError::Unavailable(format!("documento somente leitura: {key}")));
        }
        Ok(())
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("lock poisoned".into())
}

impl DocumentStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        self.check_available()?;
        let docs = self.documents.lock().map_err(|_| poisoned())?;
        Ok(docs.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        self.check_writable(key)?;
        let mut docs = self.documents.lock().map_err(|_| poisoned())?;

        if let Some(quota) = *self.quota.lock().map_err(|_| poisoned())? {
            let others: usize = docs
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if others + key.len() + value.len() > quota {
                return Err(StoreError::QuotaExceeded {
                    key: key.to_string(),
                });
            }
        }

        docs.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.check_writable(key)?;
        self.documents
            .lock()
            .map_err(|_| poisoned())?
            .remove(key);
        Ok(())
    }
}
