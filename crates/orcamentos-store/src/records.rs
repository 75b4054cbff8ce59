//! Whole-document record collections.

use serde::de::DeserializeOwned;
use serde::Serialize;

use orcamentos_shared::IdGrain;

use crate::error::{Result, StoreError};
use crate::storage::DocumentStorage;

/// Quote, folder and attachment operations over a [`DocumentStorage`].
///
/// Every mutation reads the whole collection, changes it in memory and
/// writes it back. Reads degrade to empty collections when the storage
/// fails; writes report the failure and leave the stored document untouched.
///
/// There is no locking: two unsynchronised writers on the same storage can
/// lose each other's updates.
pub struct RecordStore<S> {
    storage: S,
    grain: IdGrain,
}

impl<S: DocumentStorage> RecordStore<S> {
    /// A store using the day grain for quote IDs.
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            grain: IdGrain::default(),
        }
    }

    /// Select the ID grain used for both ID assignment and duplicate checks.
    pub fn with_grain(mut self, grain: IdGrain) -> Self {
        self.grain = grain;
        self
    }

    pub fn grain(&self) -> IdGrain {
        self.grain
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Load a collection, failing on unreadable or corrupted documents.
    pub(crate) fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        match self.storage.read(key)? {
            None => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(&raw).map_err(|source| StoreError::Corrupted {
                key: key.to_string(),
                source,
            }),
        }
    }

    /// Load a collection for display. Failures yield an empty collection.
    pub(crate) fn load_or_empty<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        self.load(key).unwrap_or_else(|e| {
            tracing::warn!(key, error = %e, "failed to load collection");
            Vec::new()
        })
    }

    pub(crate) fn save<T: Serialize>(&self, key: &str, records: &[T]) -> Result<()> {
        let raw = serde_json::to_string(records)?;
        self.storage.write(key, &raw).map_err(|e| {
            tracing::error!(key, error = %e, "failed to write collection");
            e
        })
    }
}
