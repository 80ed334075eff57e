//! Hub config loader (strict parsing).

pub mod schema;

use std::fs;

use syncstore_core::error::{Result, SyncStoreError};

pub use schema::{
    HubConfig, OriginPatternSpec, PermissionSpec, ServerSection, StorageKind, StorageSection,
    TaggedPattern,
};

pub fn load_from_file(path: &str) -> Result<HubConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| SyncStoreError::Internal(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<HubConfig> {
    let cfg: HubConfig = serde_yaml::from_str(s)
        .map_err(|e| SyncStoreError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
