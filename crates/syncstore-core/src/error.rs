//! Shared error type across syncstore crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / malformed message.
    BadRequest,
    /// Origin is not permitted to invoke the operation.
    NotAllowed,
    /// The storage engine rejected the call.
    StorageFailed,
    /// The storage engine could not be obtained.
    Unavailable,
    /// Unsupported config/protocol version.
    UnsupportedVersion,
    /// Internal error.
    Internal,
}

impl ClientCode {
    /// String representation used in diagnostics and metrics labels.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::NotAllowed => "NOT_ALLOWED",
            ClientCode::StorageFailed => "STORAGE_FAILED",
            ClientCode::Unavailable => "UNAVAILABLE",
            ClientCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, SyncStoreError>;

/// Unified error type used by core and hub.
#[derive(Debug, Error)]
pub enum SyncStoreError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("Invalid permissions for {0}")]
    NotAllowed(String),
    #[error("{0}")]
    Storage(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("unsupported version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl SyncStoreError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            SyncStoreError::BadRequest(_) => ClientCode::BadRequest,
            SyncStoreError::NotAllowed(_) => ClientCode::NotAllowed,
            SyncStoreError::Storage(_) => ClientCode::StorageFailed,
            SyncStoreError::Unavailable(_) => ClientCode::Unavailable,
            SyncStoreError::UnsupportedVersion => ClientCode::UnsupportedVersion,
            SyncStoreError::Internal(_) => ClientCode::Internal,
        }
    }
}
