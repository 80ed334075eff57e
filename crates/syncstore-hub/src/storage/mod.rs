//! Key-value storage providers.
//!
//! The hub only ever talks to `KeyValueStore`; the concrete engine is picked
//! from config at startup. Methods take `&self` so one store can be shared by
//! the listener and the ops endpoints.

mod file;
mod memory;

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use syncstore_core::SyncStoreError;

use crate::config::schema::{StorageKind, StorageSection};

pub use file::JsonFileStore;
pub use memory::MemoryStore;

/// Failures raised by a storage engine. The `Display` text is what a peer
/// sees in the response `error` field.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("quota exceeded: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded { needed: usize, quota: usize },
    #[error("corrupt store: {0}")]
    Corrupt(String),
    #[error("storage io failed: {0}")]
    Io(String),
    #[error("storage lock poisoned")]
    Poisoned,
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

impl From<StorageError> for SyncStoreError {
    fn from(e: StorageError) -> Self {
        SyncStoreError::Storage(e.to_string())
    }
}

/// Minimal storage engine surface used by the operation table.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;
    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> StorageResult<()>;
    fn clear(&self) -> StorageResult<()>;
    /// All keys in the engine's natural enumeration order.
    fn keys(&self) -> StorageResult<Vec<String>>;
}

/// Open the configured engine. A failure here means the hub announces
/// itself unavailable and never installs a listener.
pub fn open(cfg: &StorageSection) -> StorageResult<Arc<dyn KeyValueStore>> {
    match cfg.kind {
        StorageKind::Memory => Ok(Arc::new(MemoryStore::new(cfg.quota_bytes))),
        StorageKind::File => {
            let path = cfg
                .path
                .as_deref()
                .ok_or_else(|| StorageError::Io("storage.path missing".into()))?;
            Ok(Arc::new(JsonFileStore::open(path, cfg.quota_bytes)?))
        }
    }
}

/// Bytes used by the map if `key` were set to `value`.
fn usage_after_set(entries: &BTreeMap<String, String>, key: &str, value: &str) -> usize {
    let current: usize = entries.iter().map(|(k, v)| k.len() + v.len()).sum();
    let replaced = entries.get(key).map(|v| key.len() + v.len()).unwrap_or(0);
    current - replaced + key.len() + value.len()
}

fn check_quota(
    entries: &BTreeMap<String, String>,
    quota: Option<usize>,
    key: &str,
    value: &str,
) -> StorageResult<()> {
    let Some(quota) = quota else { return Ok(()) };
    let needed = usage_after_set(entries, key, value);
    if needed > quota {
        return Err(StorageError::QuotaExceeded { needed, quota });
    }
    Ok(())
}
