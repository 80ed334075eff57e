use serde::Deserialize;
use syncstore_core::error::{Result, SyncStoreError};
use syncstore_core::Operation;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HubConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub storage: StorageSection,

    /// Absent list means nobody may do anything.
    #[serde(default)]
    pub permissions: Vec<PermissionSpec>,
}

impl HubConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(SyncStoreError::UnsupportedVersion);
        }

        self.server.validate()?;
        self.storage.validate()?;

        for (i, p) in self.permissions.iter().enumerate() {
            if p.allow.is_empty() {
                return Err(SyncStoreError::BadRequest(format!(
                    "permissions[{i}].allow must not be empty"
                )));
            }
        }
        if self.permissions.is_empty() {
            tracing::warn!("no permissions configured; every request will be denied");
        }

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Inbound messages waiting for the listener.
    #[serde(default = "default_inbound_queue")]
    pub inbound_queue: usize,

    /// Outbound messages buffered per peer connection.
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,

    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            inbound_queue: default_inbound_queue(),
            outbound_queue: default_outbound_queue(),
            max_message_bytes: default_max_message_bytes(),
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=65536).contains(&self.inbound_queue) {
            return Err(SyncStoreError::BadRequest(
                "server.inbound_queue must be between 1 and 65536".into(),
            ));
        }
        if !(1..=65536).contains(&self.outbound_queue) {
            return Err(SyncStoreError::BadRequest(
                "server.outbound_queue must be between 1 and 65536".into(),
            ));
        }
        if self.max_message_bytes < 64 {
            return Err(SyncStoreError::BadRequest(
                "server.max_message_bytes must be at least 64".into(),
            ));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "127.0.0.1:8787".into()
}
fn default_inbound_queue() -> usize {
    1024
}
fn default_outbound_queue() -> usize {
    256
}
fn default_max_message_bytes() -> usize {
    1024 * 1024
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    Memory,
    File,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageSection {
    #[serde(default)]
    pub kind: StorageKind,
    /// Backing file for `kind: file`.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub quota_bytes: Option<usize>,
}

impl StorageSection {
    pub fn validate(&self) -> Result<()> {
        if self.kind == StorageKind::File && self.path.as_deref().map_or(true, str::is_empty) {
            return Err(SyncStoreError::BadRequest(
                "storage.path is required when storage.kind is file".into(),
            ));
        }
        if self.quota_bytes == Some(0) {
            return Err(SyncStoreError::BadRequest(
                "storage.quota_bytes must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// One permission rule as written by the policy author.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PermissionSpec {
    pub origin: OriginPatternSpec,
    pub allow: Vec<Operation>,
}

/// Origin matcher source. A bare string is a glob (`*` wildcard; without
/// `*` it is an exact match).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum OriginPatternSpec {
    Glob(String),
    Tagged(TaggedPattern),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaggedPattern {
    Exact(String),
    Prefix(String),
    Glob(String),
    /// Anchored at both ends when compiled.
    Regex(String),
}
