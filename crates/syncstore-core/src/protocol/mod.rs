//! `sync-storage` protocol modules.
//!
//! - `operation`: the closed set of storage verbs a peer may invoke.
//! - `text`: JSON request/response envelopes plus the plain-text handshake
//!   announcements.
//!
//! Decoding is panic-free: anything that is not a well-formed `sync-storage`
//! message is reported as `SyncStoreError` so the caller can drop it without a
//! reply.

pub mod operation;
pub mod text;

pub use operation::Operation;
pub use text::{decode, encode, Announcement, Call, Command, Response};

/// Method namespace; every request method is `"<NAMESPACE>:<operation>"`.
pub const NAMESPACE: &str = "sync-storage";
