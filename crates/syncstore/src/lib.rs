//! Top-level facade crate for syncstore.
//!
//! Re-exports the protocol core and the hub library so embedders can depend on a single crate.

pub mod core {
    pub use syncstore_core::*;
}

pub mod hub {
    pub use syncstore_hub::*;
}
