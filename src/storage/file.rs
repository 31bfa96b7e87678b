//! File-backed storage: one `<name>.json` file per namespace.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{StorageBackend, StorageError};

#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Opens (creating if needed) the directory holding namespace records.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }
}

impl StorageBackend for FileStorage {
    fn load_namespace(&self, name: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.record_path(name)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save_namespace(&self, name: &str, record: &str) -> Result<(), StorageError> {
        let path = self.record_path(name);
        // Write then rename so a crash never leaves a half-written record
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, record)?;
        fs::rename(&tmp, &path)?;
        debug!(namespace = name, bytes = record.len(), "Saved namespace record");
        Ok(())
    }

    fn remove_namespace(&self, name: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.record_path(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
