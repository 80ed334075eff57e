//! Dispatcher module exports.
//!
//! `table` maps each operation to its storage handler; `dispatcher` runs the
//! per-message pipeline (decode, handshake fast paths, policy, execute,
//! respond).

pub mod dispatcher;
pub mod table;

pub use dispatcher::{Dispatcher, Outbound};
pub use table::{Handler, OperationTable};
