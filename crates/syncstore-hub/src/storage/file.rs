use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tempfile::NamedTempFile;

use super::{check_quota, KeyValueStore, StorageError, StorageResult};

/// Store persisted as a single JSON object on disk.
///
/// Every mutation writes a sibling temp file and renames it over the store
/// before the in-memory copy is updated, so a failed or interrupted write
/// leaves both unchanged.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
    quota: Option<usize>,
}

impl JsonFileStore {
    /// Load `path` if it exists, or start empty. A file that is not a JSON
    /// object of strings is reported as corrupt.
    pub fn open(path: impl AsRef<Path>, quota: Option<usize>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let contents = fs::read_to_string(&path)
                .map_err(|e| StorageError::Io(format!("read {}: {e}", path.display())))?;
            serde_json::from_str(&contents)
                .map_err(|e| StorageError::Corrupt(format!("{}: {e}", path.display())))?
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
            quota,
        })
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, BTreeMap<String, String>>> {
        self.entries.lock().map_err(|_| StorageError::Poisoned)
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> StorageResult<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)
            .map_err(|e| StorageError::Io(format!("create {}: {e}", dir.display())))?;

        let contents = serde_json::to_vec_pretty(entries)
            .map_err(|e| StorageError::Corrupt(format!("encode: {e}")))?;
        let io_err = |e: std::io::Error| StorageError::Io(format!("write {}: {e}", self.path.display()));

        let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(&contents).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;
        Ok(())
    }

    fn mutate(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, String>) -> StorageResult<()>,
    ) -> StorageResult<()> {
        let mut entries = self.lock()?;
        let mut next = entries.clone();
        f(&mut next)?;
        if next == *entries {
            return Ok(());
        }
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.mutate(|m| {
            check_quota(m, self.quota, key, value)?;
            m.insert(key.to_string(), value.to_string());
            Ok(())
        })
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.mutate(|m| {
            m.remove(key);
            Ok(())
        })
    }

    fn clear(&self) -> StorageResult<()> {
        self.mutate(|m| {
            m.clear();
            Ok(())
        })
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.lock()?.keys().cloned().collect())
    }
}
