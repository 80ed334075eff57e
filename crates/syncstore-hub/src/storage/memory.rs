use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::{check_quota, KeyValueStore, StorageError, StorageResult};

/// In-process store with an optional byte quota (keys + values).
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new(quota: Option<usize>) -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            quota,
        }
    }

    // Poisoned lock means a writer panicked mid-update; surface it instead of
    // propagating the panic into the listener.
    fn lock(&self) -> StorageResult<MutexGuard<'_, BTreeMap<String, String>>> {
        self.entries.lock().map_err(|_| StorageError::Poisoned)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut entries = self.lock()?;
        check_quota(&entries, self.quota, key, value)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn clear(&self) -> StorageResult<()> {
        self.lock()?.clear();
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.lock()?.keys().cloned().collect())
    }
}
