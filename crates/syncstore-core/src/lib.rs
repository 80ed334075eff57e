//! syncstore core: transport-agnostic protocol primitives and error types.
//!
//! This crate defines the wire-level contracts of the `sync-storage` message
//! protocol (requests, responses, handshake announcements) and the error
//! surface shared by the hub and embedders. It carries no transport, storage or
//! runtime dependencies so it can be reused in multiple contexts.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. Every fallible path
//! surfaces as `SyncStoreError`/`Result`: hostile or unrelated traffic on a
//! shared channel must never take the listener down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{Result, SyncStoreError};
pub use protocol::{Announcement, Call, Command, Operation, Response};
