//! In-memory storage backend, optionally quota-limited.

use std::collections::HashMap;

use parking_lot::Mutex;

use super::{StorageBackend, StorageError};

/// Holds namespace records in a map. With a quota set, a save that would push
/// the combined size of all records past it is rejected, the way browser
/// storage rejects writes once full.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    records: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota: usize) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            quota: Some(quota),
        }
    }

    /// Writes a record verbatim, bypassing the quota. Used to plant corrupted
    /// or hand-crafted records.
    pub fn insert_raw(&self, name: &str, record: impl Into<String>) {
        self.records.lock().insert(name.to_string(), record.into());
    }

    pub fn raw(&self, name: &str) -> Option<String> {
        self.records.lock().get(name).cloned()
    }
}

impl StorageBackend for MemoryStorage {
    fn load_namespace(&self, name: &str) -> Result<Option<String>, StorageError> {
        Ok(self.records.lock().get(name).cloned())
    }

    fn save_namespace(&self, name: &str, record: &str) -> Result<(), StorageError> {
        let mut records = self.records.lock();

        if let Some(quota) = self.quota {
            let others: usize = records
                .iter()
                .filter(|(k, _)| k.as_str() != name)
                .map(|(_, v)| v.len())
                .sum();
            let needed = others + record.len();
            if needed > quota {
                return Err(StorageError::QuotaExceeded { needed, quota });
            }
        }

        records.insert(name.to_string(), record.to_string());
        Ok(())
    }

    fn remove_namespace(&self, name: &str) -> Result<(), StorageError> {
        self.records.lock().remove(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_namespace() {
        let storage = MemoryStorage::new();
        assert!(storage.load_namespace("data_cache").unwrap().is_none());
    }

    #[test]
    fn test_save_and_load() {
        let storage = MemoryStorage::new();
        storage.save_namespace("data_cache", "{}").unwrap();
        assert_eq!(
            storage.load_namespace("data_cache").unwrap().as_deref(),
            Some("{}")
        );
    }

    #[test]
    fn test_quota_rejects_oversized_write() {
        let storage = MemoryStorage::with_quota(10);
        storage.save_namespace("a", "12345").unwrap();

        let result = storage.save_namespace("b", "1234567");
        assert!(matches!(
            result,
            Err(StorageError::QuotaExceeded { needed: 12, quota: 10 })
        ));
        assert!(storage.raw("b").is_none());
    }

    #[test]
    fn test_quota_counts_replaced_record_once() {
        let storage = MemoryStorage::with_quota(10);
        storage.save_namespace("a", "1234567890").unwrap();
        // Replacing the same namespace does not double count it
        storage.save_namespace("a", "0987654321").unwrap();
    }

    #[test]
    fn test_remove_namespace() {
        let storage = MemoryStorage::new();
        storage.insert_raw("a", "x");
        storage.remove_namespace("a").unwrap();
        assert!(storage.raw("a").is_none());
    }
}
