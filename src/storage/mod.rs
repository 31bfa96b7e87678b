//! Storage Module
//!
//! Durable, synchronous, quota-limited backends that hold one serialized
//! record per cache namespace.

mod file;
mod memory;

use thiserror::Error;

pub use file::FileStorage;
pub use memory::MemoryStorage;

// == Storage Error ==
/// Failures reported by a storage medium.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The write would exceed the medium's quota
    #[error("Storage quota exceeded: {needed} bytes needed, quota is {quota} bytes")]
    QuotaExceeded { needed: usize, quota: usize },

    /// Underlying I/O failure
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The medium cannot be used at all
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

// == Storage Backend ==
/// Whole-record load/save keyed by a namespace's storage key.
///
/// Records are raw serialized text so that a corrupted record can reach the
/// cache layer, which decides how to degrade.
pub trait StorageBackend: Send + Sync {
    /// Returns the raw record, or `None` if nothing was ever saved.
    fn load_namespace(&self, name: &str) -> Result<Option<String>, StorageError>;

    /// Replaces the whole record.
    fn save_namespace(&self, name: &str, record: &str) -> Result<(), StorageError>;

    /// Drops the record entirely.
    fn remove_namespace(&self, name: &str) -> Result<(), StorageError>;
}
