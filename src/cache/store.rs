//! Namespace Store Module
//!
//! Whole-record persistence of one namespace's [`CacheMap`]. Every mutation
//! is read-modify-write of the entire map.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::cache::CacheMap;
use crate::error::Result;
use crate::storage::StorageBackend;

// == Cache Namespace ==
/// The two independent cache partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheNamespace {
    Images,
    Data,
}

impl CacheNamespace {
    /// Fixed key under which the namespace's record is stored.
    pub fn storage_key(&self) -> &'static str {
        match self {
            CacheNamespace::Images => "image_url_cache",
            CacheNamespace::Data => "data_cache",
        }
    }
}

impl fmt::Display for CacheNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheNamespace::Images => f.write_str("images"),
            CacheNamespace::Data => f.write_str("data"),
        }
    }
}

// == Namespace Store ==
/// Loads and saves one namespace against a shared [`StorageBackend`].
///
/// The lock serializes read-modify-write cycles within this process only;
/// other processes sharing the medium can still overwrite each other.
pub struct NamespaceStore {
    namespace: CacheNamespace,
    backend: Arc<dyn StorageBackend>,
    lock: Mutex<()>,
}

impl NamespaceStore {
    pub fn new(namespace: CacheNamespace, backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            namespace,
            backend,
            lock: Mutex::new(()),
        }
    }

    pub fn namespace(&self) -> CacheNamespace {
        self.namespace
    }

    // == Load ==
    /// Reads the namespace. A missing, unreadable or unparsable record
    /// yields an empty map.
    pub fn load(&self) -> CacheMap {
        match self.try_load() {
            Ok(map) => map,
            Err(e) => {
                warn!(namespace = %self.namespace, error = %e, "Cache record unusable, starting empty");
                CacheMap::new()
            }
        }
    }

    /// Strict variant of [`load`](Self::load).
    pub fn try_load(&self) -> Result<CacheMap> {
        let raw = self.backend.load_namespace(self.namespace.storage_key())?;
        match raw {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(CacheMap::new()),
        }
    }

    // == Save ==
    /// Writes the whole map back. Failures are logged and dropped; the change
    /// simply does not survive this process.
    pub fn save(&self, map: &CacheMap) {
        if let Err(e) = self.try_save(map) {
            warn!(namespace = %self.namespace, error = %e, "Failed to persist cache record");
        }
    }

    /// Strict variant of [`save`](Self::save).
    pub fn try_save(&self, map: &CacheMap) -> Result<()> {
        let record = serde_json::to_string(map)?;
        self.backend
            .save_namespace(self.namespace.storage_key(), &record)?;
        debug!(namespace = %self.namespace, entries = map.len(), "Persisted cache record");
        Ok(())
    }

    // == Read ==
    /// Runs `f` over a freshly loaded map without writing anything back.
    pub fn read<R>(&self, f: impl FnOnce(&CacheMap) -> R) -> R {
        let _guard = self.lock.lock();
        f(&self.load())
    }

    // == Update ==
    /// Loads, lets `f` mutate, and saves if `f` reports a change.
    ///
    /// `f` returns its result together with a dirty flag.
    pub fn update<R>(&self, f: impl FnOnce(&mut CacheMap) -> (R, bool)) -> R {
        let _guard = self.lock.lock();
        let mut map = self.load();
        let (result, dirty) = f(&mut map);
        if dirty {
            self.save(&map);
        }
        result
    }

    /// Like [`update`](Self::update) but surfaces the save error instead of
    /// absorbing it.
    pub fn try_update<R>(&self, f: impl FnOnce(&mut CacheMap) -> (R, bool)) -> Result<R> {
        let _guard = self.lock.lock();
        let mut map = self.load();
        let (result, dirty) = f(&mut map);
        if dirty {
            self.try_save(&map)?;
        }
        Ok(result)
    }

    // == Clear ==
    /// Drops every entry of the namespace and returns how many there were.
    /// Counting and removal happen under one lock hold.
    pub fn clear(&self) -> usize {
        let _guard = self.lock.lock();
        let removed = self.load().len();
        if let Err(e) = self.backend.remove_namespace(self.namespace.storage_key()) {
            warn!(namespace = %self.namespace, error = %e, "Failed to clear cache record");
            // Fall back to overwriting with an empty record
            self.save(&CacheMap::new());
        }
        removed
    }
}

impl fmt::Debug for NamespaceStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamespaceStore")
            .field("namespace", &self.namespace)
            .finish()
    }
}
