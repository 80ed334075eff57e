//! Policy layer (origin patterns, permission entries).
//!
//! Compiles the configured permission list into matchers once at startup; the
//! resulting `PermissionPolicy` is immutable and shared by every message turn.

pub mod engine;
pub mod pattern;

pub use engine::{DenyReason, PermissionEntry, PermissionPolicy, PolicyDecision};
pub use pattern::OriginPattern;
