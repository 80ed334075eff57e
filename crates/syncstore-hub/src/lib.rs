//! syncstore hub library entry.
//!
//! Wires the permission policy, storage providers, dispatcher and lifecycle
//! onto a message bus, and exposes a WebSocket relay that carries messages
//! between peer documents and the hub. Consumed by the binary (`main.rs`) and
//! by integration tests.

pub mod app_state;
pub mod config;
pub mod dispatch;
pub mod lifecycle;
pub mod obs;
pub mod ops;
pub mod policy;
pub mod router;
pub mod storage;
pub mod transport;
